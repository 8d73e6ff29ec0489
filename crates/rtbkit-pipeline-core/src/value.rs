//! Raw context documents
//!
//! A context file is parsed into a [`Value`] tree first. Files are merged at
//! this level, and only then is the tree flattened into string-valued scopes.

use indexmap::IndexMap;
use serde::Deserialize;

/// Parsed YAML or JSON document, before flattening into scopes
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Sequence(Vec<Value>),
    /// Keys keep document order
    Mapping(IndexMap<String, Value>),
}

impl Value {
    /// The entries of a mapping, `None` for any other kind of value
    pub fn as_mapping(&self) -> Option<&IndexMap<String, Value>> {
        if let Value::Mapping(entries) = self {
            Some(entries)
        } else {
            None
        }
    }

    /// Text stored in a scope for this value
    ///
    /// Booleans and numbers use their display form. Null, sequences and
    /// mappings have no scalar text.
    pub fn scalar_text(&self) -> Option<String> {
        let text = match self {
            Value::String(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Null | Value::Sequence(_) | Value::Mapping(_) => return None,
        };
        Some(text)
    }

    /// Kind of value, used in load errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Integer(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Sequence(_) => "sequence",
            Value::Mapping(_) => "mapping",
        }
    }

    /// Layer a later document over this one
    ///
    /// Mappings merge key by key. A `null` in the later document deletes the
    /// key. Anything else in the later document replaces what was here.
    pub fn merge(&mut self, later: Value) {
        let Value::Mapping(layer) = later else {
            *self = later;
            return;
        };
        let Value::Mapping(entries) = self else {
            *self = Value::Mapping(layer);
            return;
        };

        for (key, incoming) in layer {
            if let Value::Null = incoming {
                entries.shift_remove(&key);
                continue;
            }
            match entries.get_mut(&key) {
                Some(current) => current.merge(incoming),
                None => {
                    entries.insert(key, incoming);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn shared(value: &Value) -> &IndexMap<String, Value> {
        value.as_mapping().unwrap()["shared"].as_mapping().unwrap()
    }

    #[test]
    fn test_scalar_text() {
        assert_eq!(
            Value::String("main".into()).scalar_text(),
            Some("main".to_string())
        );
        assert_eq!(Value::Bool(true).scalar_text(), Some("true".to_string()));
        assert_eq!(Value::Integer(42).scalar_text(), Some("42".to_string()));
        assert_eq!(Value::Float(1.5).scalar_text(), Some("1.5".to_string()));
        assert_eq!(Value::Null.scalar_text(), None);
        assert_eq!(Value::Sequence(vec![]).scalar_text(), None);
        assert_eq!(Value::Mapping(IndexMap::new()).scalar_text(), None);
    }

    #[test]
    fn test_deserialize_yaml_mapping() {
        let value: Value = serde_yaml::from_str("shared:\n  REPO_OWNER: acme\n  RETRIES: 3\n")
            .unwrap();

        let scope = shared(&value);
        assert_eq!(scope["REPO_OWNER"], Value::String("acme".into()));
        assert_eq!(scope["RETRIES"], Value::Integer(3));
    }

    #[test]
    fn test_merge_deep() {
        let mut base: Value =
            serde_yaml::from_str("shared:\n  REPO_OWNER: acme\n  REPO_NAME: bidder\n").unwrap();
        let overlay: Value = serde_yaml::from_str("shared:\n  REPO_NAME: fork\n").unwrap();

        base.merge(overlay);

        let scope = shared(&base);
        assert_eq!(scope["REPO_OWNER"], Value::String("acme".into()));
        assert_eq!(scope["REPO_NAME"], Value::String("fork".into()));
    }

    #[test]
    fn test_merge_null_removes_key() {
        let mut base: Value =
            serde_yaml::from_str("shared:\n  REPO_OWNER: acme\n  REPO_NAME: bidder\n").unwrap();
        let overlay: Value = serde_yaml::from_str("shared:\n  REPO_OWNER: null\n").unwrap();

        base.merge(overlay);

        let scope = shared(&base);
        assert!(!scope.contains_key("REPO_OWNER"));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn test_merge_sequence_replaces_scalar() {
        let mut base = Value::String("scalar".into());
        base.merge(Value::Sequence(vec![Value::String("a".into())]));

        match base {
            Value::Sequence(items) => assert_eq!(items, vec![Value::String("a".into())]),
            other => panic!("expected a sequence, got a {}", other.type_name()),
        }
    }
}
