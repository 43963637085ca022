use std::fmt;

use serde::Serialize;

/// Sorted, duplicate-free set of node keys.
///
/// Backed by a sorted vector; lookups are binary searches and iteration is
/// always in key order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct KeySet {
    keys: Vec<String>,
}

impl KeySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if `key` is in the set.
    pub fn contains(&self, key: &str) -> bool {
        self.position(key).is_ok()
    }

    /// Adds `key`; returns true if the set changed.
    pub fn insert(&mut self, key: &str) -> bool {
        match self.position(key) {
            Ok(_) => false,
            Err(at) => {
                self.keys.insert(at, key.to_owned());
                true
            }
        }
    }

    /// Removes `key`; returns true if the set changed.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.position(key) {
            Ok(at) => {
                self.keys.remove(at);
                true
            }
            Err(_) => false,
        }
    }

    /// Number of keys in the set.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if the set holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterates keys in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.keys.iter().map(String::as_str)
    }

    fn position(&self, key: &str) -> std::result::Result<usize, usize> {
        self.keys.binary_search_by(|probe| probe.as_str().cmp(key))
    }
}

impl<S: AsRef<str>> FromIterator<S> for KeySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = KeySet::new();
        for key in iter {
            set.insert(key.as_ref());
        }
        set
    }
}

impl fmt::Display for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, key) in self.keys.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            f.write_str(key)?;
        }
        f.write_str("}")
    }
}
