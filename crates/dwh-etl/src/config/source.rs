//! Configuration sources: sectioned key/value lookups.
//!
//! Section and key names are matched case-insensitively, the same way the
//! legacy INI-style `dwh.cfg` files were read.

use std::collections::HashMap;

use serde_yaml::Value;

use crate::error::{EtlError, Result};

/// A sectioned key/value configuration collaborator.
pub trait ConfigSource {
    /// Look up an optional value. Empty values are treated as absent.
    fn get_optional(&self, section: &str, key: &str) -> Option<String>;

    /// Look up a required value, failing with `ConfigMissing` if absent.
    fn get(&self, section: &str, key: &str) -> Result<String> {
        self.get_optional(section, key)
            .ok_or_else(|| EtlError::missing(section, key))
    }
}

/// Configuration backed by a YAML document whose top-level mappings are sections.
///
/// ```yaml
/// cluster:
///   host: example.abc123.us-west-2.redshift.amazonaws.com
///   db_port: 5439
/// ```
#[derive(Debug, Clone)]
pub struct YamlSource {
    root: serde_yaml::Mapping,
}

impl YamlSource {
    /// Parse a YAML document.
    pub fn parse(yaml: &str) -> Result<Self> {
        let value: Value = serde_yaml::from_str(yaml)?;
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Err(EtlError::Config("configuration is empty".into())),
            _ => Err(EtlError::Config(
                "configuration root must be a mapping of sections".into(),
            )),
        }
    }

    fn section(&self, section: &str) -> Option<&serde_yaml::Mapping> {
        lookup(&self.root, section).and_then(Value::as_mapping)
    }
}

impl ConfigSource for YamlSource {
    fn get_optional(&self, section: &str, key: &str) -> Option<String> {
        let value = lookup(self.section(section)?, key)?;
        let text = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        let text = text.trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

fn lookup<'a>(mapping: &'a serde_yaml::Mapping, name: &str) -> Option<&'a Value> {
    mapping.iter().find_map(|(k, v)| match k {
        Value::String(k) if k.eq_ignore_ascii_case(name) => Some(v),
        _ => None,
    })
}

/// In-memory configuration, mostly useful for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MapSource {
    values: HashMap<(String, String), String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, returning the source for chaining.
    pub fn with(mut self, section: &str, key: &str, value: impl Into<String>) -> Self {
        self.insert(section, key, value);
        self
    }

    pub fn insert(&mut self, section: &str, key: &str, value: impl Into<String>) {
        self.values.insert(
            (section.to_ascii_lowercase(), key.to_ascii_lowercase()),
            value.into(),
        );
    }

    pub fn remove(&mut self, section: &str, key: &str) {
        self.values
            .remove(&(section.to_ascii_lowercase(), key.to_ascii_lowercase()));
    }
}

impl ConfigSource for MapSource {
    fn get_optional(&self, section: &str, key: &str) -> Option<String> {
        self.values
            .get(&(section.to_ascii_lowercase(), key.to_ascii_lowercase()))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

/// Strip one pair of surrounding single quotes (`'s3://bucket/key'`).
pub(crate) fn unquote(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('\'') && trimmed.ends_with('\'') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_lookup_is_case_insensitive() {
        let source = YamlSource::parse("CLUSTER:\n  HOST: redshift.local\n  DB_PORT: 5439\n")
            .unwrap();
        assert_eq!(source.get("cluster", "host").unwrap(), "redshift.local");
        assert_eq!(source.get("Cluster", "db_port").unwrap(), "5439");
    }

    #[test]
    fn test_yaml_missing_key_is_config_missing() {
        let source = YamlSource::parse("cluster:\n  host: h\n").unwrap();
        let err = source.get("cluster", "db_name").unwrap_err();
        assert!(matches!(
            err,
            EtlError::ConfigMissing { ref section, ref key } if section == "cluster" && key == "db_name"
        ));
        assert!(matches!(
            source.get("s3", "log_data").unwrap_err(),
            EtlError::ConfigMissing { .. }
        ));
    }

    #[test]
    fn test_yaml_empty_value_is_absent() {
        let source = YamlSource::parse("s3:\n  log_jsonpath: ''\n  song_data:\n").unwrap();
        assert!(source.get_optional("s3", "log_jsonpath").is_none());
        assert!(source.get_optional("s3", "song_data").is_none());
    }

    #[test]
    fn test_yaml_rejects_non_mapping_root() {
        assert!(matches!(
            YamlSource::parse("- a\n- b\n").unwrap_err(),
            EtlError::Config(_)
        ));
        assert!(matches!(
            YamlSource::parse("").unwrap_err(),
            EtlError::Config(_) | EtlError::Yaml(_)
        ));
    }

    #[test]
    fn test_map_source() {
        let mut source = MapSource::new().with("IAM_ROLE", "ARN", "arn:aws:iam::1:role/r");
        assert_eq!(source.get("iam_role", "arn").unwrap(), "arn:aws:iam::1:role/r");
        source.remove("iam_role", "arn");
        assert!(source.get("iam_role", "arn").is_err());
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("'s3://bucket/log'".into()), "s3://bucket/log");
        assert_eq!(unquote("s3://bucket/log".into()), "s3://bucket/log");
        assert_eq!(unquote("'".into()), "'");
    }
}
