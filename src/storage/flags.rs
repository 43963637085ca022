use std::fmt;

use serde::Serialize;

/// Name/value marker attached to a node.
///
/// Names are unique per node. A flag without a value is written as
/// `Flag::named`; an empty value string is treated the same way.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Flag {
    name: String,
    value: Option<String>,
}

impl Flag {
    /// Creates a flag carrying `value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self {
            name: name.into(),
            value: (!value.is_empty()).then_some(value),
        }
    }

    /// Creates a flag without a value.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// Flag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flag value, `None` when the flag carries no value.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Returns true if `self`, used as a selector entry, matches `other`.
    ///
    /// A selector entry without a value matches any value.
    pub fn matches(&self, other: &Flag) -> bool {
        self.name == other.name && (self.value.is_none() || self.value == other.value)
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}:<{}>", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

/// Returns the flag named `name`, if present.
pub(crate) fn find_flag<'a>(flags: &'a [Flag], name: &str) -> Option<&'a Flag> {
    flags.iter().find(|flag| flag.name == name)
}

/// Selects nodes with (or without) a set of flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagSelector {
    with: bool,
    flags: Vec<Flag>,
}

impl FlagSelector {
    /// Matches nodes that carry every listed flag.
    pub fn with(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self {
            with: true,
            flags: flags.into_iter().collect(),
        }
    }

    /// Matches nodes that carry none of the listed flags.
    pub fn without(flags: impl IntoIterator<Item = Flag>) -> Self {
        Self {
            with: false,
            flags: flags.into_iter().collect(),
        }
    }

    /// Evaluates the selector against a node's flags.
    pub fn matches(&self, node_flags: &[Flag]) -> bool {
        self.flags.iter().all(|wanted| {
            let present = node_flags.iter().any(|flag| wanted.matches(flag));
            present == self.with
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_flags() -> Vec<Flag> {
        vec![Flag::new("color", "red"), Flag::named("abstract")]
    }

    #[test]
    fn empty_value_is_normalised() {
        assert_eq!(Flag::new("temporary", ""), Flag::named("temporary"));
        assert_eq!(Flag::new("color", "red").value(), Some("red"));
    }

    #[test]
    fn wildcard_matches_any_value() {
        let flags = node_flags();
        assert!(FlagSelector::with([Flag::named("color")]).matches(&flags));
        assert!(FlagSelector::with([Flag::new("color", "red")]).matches(&flags));
        assert!(!FlagSelector::with([Flag::new("color", "blue")]).matches(&flags));
    }

    #[test]
    fn with_requires_all_and_without_requires_none() {
        let flags = node_flags();
        assert!(FlagSelector::with([Flag::named("color"), Flag::named("abstract")]).matches(&flags));
        assert!(!FlagSelector::with([Flag::named("color"), Flag::named("temporary")]).matches(&flags));
        assert!(FlagSelector::without([Flag::named("temporary")]).matches(&flags));
        assert!(!FlagSelector::without([Flag::named("temporary"), Flag::named("abstract")])
            .matches(&flags));
    }

    #[test]
    fn display_matches_dump_format() {
        assert_eq!(Flag::new("color", "red").to_string(), "color:<red>");
        assert_eq!(Flag::named("abstract").to_string(), "abstract");
    }
}
