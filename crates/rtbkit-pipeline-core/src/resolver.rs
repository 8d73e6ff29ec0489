//! Configuration resolution
//!
//! A key resolves through three tiers, highest first:
//!
//! 1. the override source (conventionally the process environment),
//! 2. the context scope passed for the lookup,
//! 3. the caller's default.
//!
//! Blank values never win a tier. Resolution is pure apart from debug logging.

use std::fmt;

use crate::error::{Error, Result};
use crate::overrides::OverrideSource;
use crate::scope::ConfigScope;

/// The tier that supplied a resolved value
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Override source (environment)
    Override,
    /// Context scope
    Scope,
    /// Caller-supplied default
    Default,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tier::Override => "override",
            Tier::Scope => "scope",
            Tier::Default => "default",
        };
        f.write_str(name)
    }
}

/// A resolved configuration value and the tier it came from
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ResolvedValue {
    /// The selected value
    pub value: String,
    /// Which tier produced it
    pub tier: Tier,
}

impl ResolvedValue {
    pub fn new(value: impl Into<String>, tier: Tier) -> Self {
        Self {
            value: value.into(),
            tier,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Apply [`normalize_identifier`] to the value, keeping the tier
    pub fn normalized(self) -> Self {
        Self {
            value: normalize_identifier(&self.value),
            tier: self.tier,
        }
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Canonical form for identifiers used as resource-name prefixes
///
/// Lower-cases the value and replaces underscores with hyphens. Bucket names
/// derived from the prefix reject both upper case and underscores.
pub fn normalize_identifier(value: &str) -> String {
    value.to_lowercase().replace('_', "-")
}

/// Resolves configuration keys through the override, scope and default tiers
#[derive(Clone, Copy)]
pub struct ConfigResolver<'a> {
    overrides: &'a dyn OverrideSource,
}

impl fmt::Debug for ConfigResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigResolver").finish_non_exhaustive()
    }
}

impl<'a> ConfigResolver<'a> {
    /// Create a resolver over the given override source
    pub fn new(overrides: &'a dyn OverrideSource) -> Self {
        Self { overrides }
    }

    /// Resolve a key
    ///
    /// Returns `None` only when no tier has a value and no default is given.
    /// A missing `scope` counts as a miss.
    pub fn resolve(
        &self,
        key: &str,
        scope: Option<&ConfigScope>,
        default: Option<&str>,
    ) -> Option<ResolvedValue> {
        let resolved = self.lookup(key, scope, default);

        log::debug!(
            "resolve {} (scope: {}, default: {}) -> {}",
            key,
            scope.map(ConfigScope::name).unwrap_or("<none>"),
            default.unwrap_or("<none>"),
            match &resolved {
                Some(r) => format!("'{}' from {}", r.value, r.tier),
                None => "<unresolved>".to_string(),
            }
        );

        resolved
    }

    /// Resolve a key that has no usable fallback
    ///
    /// Fails with a missing-required error naming the key when every tier
    /// comes up empty.
    pub fn require(
        &self,
        key: &str,
        scope: Option<&ConfigScope>,
        default: Option<&str>,
    ) -> Result<ResolvedValue> {
        self.resolve(key, scope, default).ok_or_else(|| {
            let err = Error::missing_required(key);
            match scope {
                Some(s) => err.with_scope(s.name()),
                None => err,
            }
        })
    }

    fn lookup(
        &self,
        key: &str,
        scope: Option<&ConfigScope>,
        default: Option<&str>,
    ) -> Option<ResolvedValue> {
        if let Some(value) = self.overrides.lookup(key) {
            if !value.is_empty() {
                return Some(ResolvedValue::new(value, Tier::Override));
            }
        }

        if let Some(value) = scope.and_then(|s| s.get(key)) {
            if !value.is_empty() {
                return Some(ResolvedValue::new(value, Tier::Scope));
            }
        }

        default.map(|d| ResolvedValue::new(d, Tier::Default))
    }
}
