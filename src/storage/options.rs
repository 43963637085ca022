use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::primitives::clock::{Clock, SystemClock};
use crate::types::{GraphError, Result};

use super::metrics::{default_metrics, GraphMetrics};

/// Configuration supplied when creating a [`super::GraphStore`].
#[derive(Clone)]
pub struct GraphOptions {
    /// Revision recording and trimming policy.
    pub history: HistoryCfg,
    /// Source of every timestamp the store takes.
    pub clock: Arc<dyn Clock>,
    /// Metrics sink.
    pub metrics: Arc<dyn GraphMetrics>,
}

impl GraphOptions {
    /// Creates options with default history policy, the system clock and no metrics.
    pub fn new() -> Self {
        Self {
            history: HistoryCfg::default(),
            clock: Arc::new(SystemClock),
            metrics: default_metrics(),
        }
    }

    /// Sets the history policy.
    pub fn history(mut self, history: HistoryCfg) -> Self {
        self.history = history;
        self
    }

    /// Sets the clock.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the metrics sink.
    pub fn metrics(mut self, metrics: Arc<dyn GraphMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Parses options from TOML text.
    ///
    /// Only the `[history]` table is read; absent keys keep their defaults.
    /// Clock and metrics are the defaults; chain [`GraphOptions::clock`] and
    /// [`GraphOptions::metrics`] on the result to replace them.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(Self::new().history(Self::history_from_toml(text)?))
    }

    /// Parses only the history policy from TOML text.
    pub fn history_from_toml(text: &str) -> Result<HistoryCfg> {
        let raw: RawConfig =
            toml::from_str(text).map_err(|source| GraphError::ConfigParse { source })?;
        raw.history.apply(HistoryCfg::default())
    }

    /// Reads options from a TOML file. See [`GraphOptions::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| GraphError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for GraphOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphOptions")
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

/// Revision history policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryCfg {
    /// Whether writers may record revisions at all.
    pub record: bool,
    /// Closed revisions older than this are trimmed.
    pub retention: Duration,
    /// Revisions starting this soon after store creation are never trimmed.
    pub permanent_init_period: Duration,
    /// Minimum time between two trimming passes.
    pub trim_interval: Duration,
}

impl Default for HistoryCfg {
    fn default() -> Self {
        Self {
            record: true,
            retention: Duration::from_secs(60 * 60 * 24),
            permanent_init_period: Duration::from_secs(60 * 60),
            trim_interval: Duration::from_secs(60),
        }
    }
}

impl HistoryCfg {
    /// Policy that never records revisions.
    pub fn disabled() -> Self {
        Self {
            record: false,
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    history: HistorySection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct HistorySection {
    record: Option<bool>,
    age_limit_minutes: Option<u64>,
    permanent_init_minutes: Option<u64>,
    trim_interval_secs: Option<u64>,
}

impl HistorySection {
    fn apply(self, mut cfg: HistoryCfg) -> Result<HistoryCfg> {
        if let Some(record) = self.record {
            cfg.record = record;
        }
        if let Some(minutes) = self.age_limit_minutes {
            cfg.retention = minutes_to_duration("age_limit_minutes", minutes)?;
        }
        if let Some(minutes) = self.permanent_init_minutes {
            cfg.permanent_init_period = minutes_to_duration("permanent_init_minutes", minutes)?;
        }
        if let Some(secs) = self.trim_interval_secs {
            cfg.trim_interval = Duration::from_secs(secs);
        }
        Ok(cfg)
    }
}

fn minutes_to_duration(key: &'static str, minutes: u64) -> Result<Duration> {
    minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or(GraphError::ConfigValue {
            key,
            value: minutes,
        })
}
