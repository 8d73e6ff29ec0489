//! Override sources
//!
//! The override tier sits above every context scope. It is conventionally the
//! process environment, but it is passed to the resolver explicitly so that
//! tests and embedding tools can supply their own.

use std::collections::HashMap;

/// Highest-precedence source of configuration values
pub trait OverrideSource: Send + Sync {
    /// Look up an override by key
    ///
    /// Implementations return the raw value. Empty values are filtered by
    /// the resolver, not here.
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Overrides read from the process environment
///
/// Variables that are unset or not valid Unicode are treated as absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvOverrides;

impl OverrideSource for EnvOverrides {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Overrides held in memory
#[derive(Debug, Clone, Default)]
pub struct MapOverrides {
    values: HashMap<String, String>,
}

impl MapOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an override
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapOverrides {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl OverrideSource for MapOverrides {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// An override source that never supplies a value
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOverrides;

impl OverrideSource for NoOverrides {
    fn lookup(&self, _key: &str) -> Option<String> {
        None
    }
}
