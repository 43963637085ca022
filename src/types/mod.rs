//! Error type shared by every module of the crate.

use std::path::PathBuf;

/// Errors surfaced by the graph store and its collaborators.
///
/// Absence (unknown key, unregistered index, missing flag) is never reported
/// through this type; lookups return `Option` or empty collections instead.
#[derive(thiserror::Error, Debug)]
pub enum GraphError {
    /// Another writer handle is still alive for the same store.
    #[error("a writer is already active on this graph")]
    WriterActive,
    /// `update` was called for a label the index does not hold.
    #[error("index '{index}' has no entry for label '{label}'")]
    IndexEntryMissing {
        /// Name of the metadata index.
        index: String,
        /// Label that was looked up.
        label: String,
    },
    /// Edge bookkeeping found a target without the matching source (or vice versa).
    #[error("inconsistent graph: {0}")]
    Inconsistent(String),
    /// Configuration file could not be read.
    #[error("failed to read graph config {path}: {source}")]
    ConfigRead {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Configuration text is not valid TOML for [`crate::GraphOptions`].
    #[error("failed to parse graph config: {source}")]
    ConfigParse {
        /// Underlying TOML error.
        source: toml::de::Error,
    },
    /// A configuration value is out of range.
    #[error("graph config key {key} is out of range: {value}")]
    ConfigValue {
        /// Offending key.
        key: &'static str,
        /// Value as written in the file.
        value: u64,
    },
    /// JSON encoding of recorded nodes failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience result alias used across the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
