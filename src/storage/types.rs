use std::fmt;
use std::sync::Arc;

/// Opaque node value.
///
/// The graph never looks inside a payload. It clones it into writer shadows
/// and passes it through [`Payload::record`] when a revision snapshot is built.
pub trait Payload: Clone + fmt::Debug + Send + Sync + 'static {
    /// Returns the form of the value that is kept in the revision history.
    fn record(&self) -> Self {
        self.clone()
    }
}

impl Payload for String {}
impl Payload for Vec<u8> {}
impl Payload for serde_json::Value {}

/// Side-data stored in an external [`super::MetadataIndex`].
///
/// Equality is used to skip index updates that would not change anything.
pub trait Metadata: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

impl<T> Metadata for T where T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {}

/// Predicate over node keys used by selector-based edges.
pub type KeySelector = Arc<dyn Fn(&str) -> bool + Send + Sync>;
