//! Configuration scopes and the two-level context
//!
//! A [`Context`] maps scope names ("shared" or a deployment stage) to
//! [`ConfigScope`]s, which in turn map setting names to string values.
//! Both are built once from a context document and never mutated afterwards.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Name of the scope holding settings common to every stage
pub const SHARED_SCOPE: &str = "shared";

/// Top-level key under which deployment-tool files (`cdk.json`) nest their scopes
const CONTEXT_KEY: &str = "context";

/// A named, read-only bucket of configuration settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigScope {
    name: String,
    entries: IndexMap<String, String>,
}

impl ConfigScope {
    /// Create an empty scope
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: IndexMap::new(),
        }
    }

    /// Add a setting, replacing any previous value for the same key
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Build a scope from a parsed mapping
    ///
    /// Scalars are stored as their text form and nulls are dropped.
    /// Sequences and mappings are rejected so lookups never see them.
    pub fn from_mapping(name: impl Into<String>, mapping: &IndexMap<String, Value>) -> Result<Self> {
        let name = name.into();
        let mut entries = IndexMap::with_capacity(mapping.len());

        for (key, value) in mapping {
            match value.scalar_text() {
                Some(text) => {
                    entries.insert(key.clone(), text);
                }
                None if matches!(value, Value::Null) => {}
                None => {
                    return Err(Error::invalid_context(
                        name.as_str(),
                        key.as_str(),
                        format!("expected a scalar, got a {}", value.type_name()),
                    ));
                }
            }
        }

        Ok(Self { name, entries })
    }

    /// The scope's name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up a setting
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Check if the scope defines a setting
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Iterate over settings
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Specifies a context file to load, either required or optional
///
/// Deployment tools keep user context in `cdk.json` and cached lookups in
/// `cdk.context.json`; the latter is usually optional.
#[derive(Debug, Clone)]
pub enum FileSpec {
    /// A required file - error if not found
    Required(PathBuf),
    /// An optional file - silently skip if not found
    Optional(PathBuf),
}

impl FileSpec {
    /// Create a required file spec
    pub fn required(path: impl Into<PathBuf>) -> Self {
        FileSpec::Required(path.into())
    }

    /// Create an optional file spec
    pub fn optional(path: impl Into<PathBuf>) -> Self {
        FileSpec::Optional(path.into())
    }

    /// Get the path for this file spec
    pub fn path(&self) -> &Path {
        match self {
            FileSpec::Required(p) => p,
            FileSpec::Optional(p) => p,
        }
    }

    /// Check if this file spec is optional
    pub fn is_optional(&self) -> bool {
        matches!(self, FileSpec::Optional(_))
    }
}

impl<P: Into<PathBuf>> From<P> for FileSpec {
    fn from(path: P) -> Self {
        FileSpec::Required(path.into())
    }
}

/// Two-level configuration context: scope name, then setting name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    scopes: IndexMap<String, ConfigScope>,
}

impl Context {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scope, replacing any previous scope with the same name
    pub fn with_scope(mut self, scope: ConfigScope) -> Self {
        self.scopes.insert(scope.name().to_string(), scope);
        self
    }

    /// Build a context from a parsed document
    ///
    /// If the document has a top-level `context` mapping the scopes are read
    /// from it, otherwise the top level holds the scopes. Entries that are
    /// not mappings (feature flags and the like) are skipped.
    pub fn from_value(value: &Value) -> Result<Self> {
        let root = match value {
            Value::Mapping(root) => root,
            // An empty document parses as null
            Value::Null => return Ok(Self::new()),
            other => {
                return Err(Error::parse(format!(
                    "context document must be a mapping, got a {}",
                    other.type_name()
                )))
            }
        };

        let entries = match root.get(CONTEXT_KEY).and_then(Value::as_mapping) {
            Some(nested) => nested,
            None => root,
        };

        let mut scopes = IndexMap::new();
        for (name, entry) in entries {
            match entry.as_mapping() {
                Some(mapping) => {
                    scopes.insert(name.clone(), ConfigScope::from_mapping(name.as_str(), mapping)?);
                }
                None => {
                    log::trace!(
                        "Skipping context entry '{}' ({} is not a scope)",
                        name,
                        entry.type_name()
                    );
                }
            }
        }

        Ok(Self { scopes })
    }

    /// Load a context from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_value(&parse_yaml(yaml)?)
    }

    /// Load a context from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_value(&parse_json(json)?)
    }

    /// Load a context file; `.json` files are parsed as JSON, anything else as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_value(&read_document(path.as_ref())?)
    }

    /// Load and merge several context files
    ///
    /// Later files override earlier ones: mappings are deep-merged and a null
    /// removes a setting. Optional files that don't exist are skipped.
    pub fn load_merged(specs: &[FileSpec]) -> Result<Self> {
        let mut merged: Option<Value> = None;

        for spec in specs {
            let path = spec.path();
            if spec.is_optional() && !path.exists() {
                log::debug!("Optional context file {} not found, skipping", path.display());
                continue;
            }

            let value = read_document(path)?;
            match merged.as_mut() {
                Some(base) => base.merge(value),
                None => merged = Some(value),
            }
        }

        match merged {
            Some(value) => Self::from_value(&value),
            None => Ok(Self::new()),
        }
    }

    /// Look up a scope by name
    pub fn scope(&self, name: &str) -> Option<&ConfigScope> {
        self.scopes.get(name)
    }

    /// The shared scope, if present
    pub fn shared(&self) -> Option<&ConfigScope> {
        self.scope(SHARED_SCOPE)
    }

    /// Iterate over scope names in document order
    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.scopes.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

fn parse_yaml(yaml: &str) -> Result<Value> {
    serde_yaml::from_str(yaml).map_err(|e| Error::parse(e.to_string()))
}

fn parse_json(json: &str) -> Result<Value> {
    serde_json::from_str(json).map_err(|e| Error::parse(e.to_string()))
}

fn read_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::io(path.display(), e))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        parse_json(&content)
    } else {
        parse_yaml(&content)
    };

    parsed.map_err(|e| e.with_help(format!("Check the syntax of {}", path.display())))
}
