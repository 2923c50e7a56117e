//! Configuration loading and validation.

mod source;
mod types;
mod validation;

pub use source::{ConfigSource, MapSource, YamlSource};
pub use types::*;

use crate::error::{EtlError, Result};
use source::unquote;
use std::path::Path;

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Self::from_source(&YamlSource::parse(yaml)?)
    }

    /// Read every value the pipeline needs from a configuration source.
    ///
    /// Fails with `ConfigMissing` on the first absent required key, and with
    /// `Config` if a value is malformed.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let port = source.get("cluster", "db_port")?;
        let db_port = port.parse::<u16>().map_err(|_| {
            EtlError::Config(format!("cluster.db_port must be a port number, got '{}'", port))
        })?;

        let cluster = ClusterConfig {
            host: source.get("cluster", "host")?,
            db_name: source.get("cluster", "db_name")?,
            db_user: source.get("cluster", "db_user")?,
            db_password: source.get("cluster", "db_password")?,
            db_port,
            ssl_mode: source
                .get_optional("cluster", "ssl_mode")
                .unwrap_or_else(types::default_require),
        };

        let iam_role = IamRoleConfig {
            arn: unquote(source.get("iam_role", "arn")?),
        };

        let s3 = S3Config {
            log_data: unquote(source.get("s3", "log_data")?),
            log_jsonpath: source
                .get_optional("s3", "log_jsonpath")
                .map(unquote)
                .unwrap_or_else(types::default_events_json_format),
            song_data: unquote(source.get("s3", "song_data")?),
            region: source
                .get_optional("s3", "region")
                .map(unquote)
                .unwrap_or_else(types::default_region),
        };

        let etl = EtlConfig {
            user_conflict_policy: match source.get_optional("etl", "user_conflict_policy") {
                Some(policy) => UserConflictPolicy::parse(&policy)?,
                None => UserConflictPolicy::default(),
            },
        };

        let config = Config {
            cluster,
            iam_role,
            s3,
            etl,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

impl ClusterConfig {
    /// Connection target for log lines. Never includes the password.
    pub fn display_target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.db_user, self.host, self.db_port, self.db_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
CLUSTER:
  HOST: dwhcluster.abc123.us-west-2.redshift.amazonaws.com
  DB_NAME: dwh
  DB_USER: dwhuser
  DB_PASSWORD: Passw0rd
  DB_PORT: 5439
IAM_ROLE:
  ARN: 'arn:aws:iam::123456789012:role/dwhRole'
S3:
  LOG_DATA: "'s3://udacity-dend/log_data'"
  LOG_JSONPATH: "'s3://udacity-dend/log_json_path.json'"
  SONG_DATA: "'s3://udacity-dend/song_data'"
"#;

    #[test]
    fn test_load_legacy_layout() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.cluster.db_port, 5439);
        assert_eq!(config.cluster.ssl_mode, "require");
        assert_eq!(config.iam_role.arn, "arn:aws:iam::123456789012:role/dwhRole");
        assert_eq!(config.s3.log_data, "s3://udacity-dend/log_data");
        assert_eq!(config.s3.log_jsonpath, "s3://udacity-dend/log_json_path.json");
        assert_eq!(config.s3.song_data, "s3://udacity-dend/song_data");
        assert_eq!(config.s3.region, "us-west-2");
        assert_eq!(
            config.etl.user_conflict_policy,
            UserConflictPolicy::AllDistinct
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dwh.yaml");
        std::fs::write(&path, SAMPLE).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.cluster.db_name, "dwh");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/dwh.yaml").unwrap_err();
        assert!(matches!(err, EtlError::Io(_)));
    }

    #[test]
    fn test_jsonpath_defaults_to_auto_ignorecase() {
        let yaml = SAMPLE.replace(
            "  LOG_JSONPATH: \"'s3://udacity-dend/log_json_path.json'\"\n",
            "",
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert_eq!(config.s3.log_jsonpath, "auto ignorecase");
    }

    #[test]
    fn test_every_required_key_reports_config_missing() {
        let required = [
            ("cluster", "host"),
            ("cluster", "db_name"),
            ("cluster", "db_user"),
            ("cluster", "db_password"),
            ("cluster", "db_port"),
            ("iam_role", "arn"),
            ("s3", "log_data"),
            ("s3", "song_data"),
        ];

        for (section, key) in required {
            let mut source = complete_source();
            source.remove(section, key);
            match Config::from_source(&source) {
                Err(EtlError::ConfigMissing {
                    section: s,
                    key: k,
                }) => {
                    assert_eq!((s.as_str(), k.as_str()), (section, key));
                }
                other => panic!("expected ConfigMissing for {section}.{key}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_invalid_port() {
        let source = complete_source().with("cluster", "db_port", "redshift");
        assert!(matches!(
            Config::from_source(&source).unwrap_err(),
            EtlError::Config(_)
        ));
    }

    #[test]
    fn test_user_conflict_policy() {
        let source = complete_source().with("etl", "user_conflict_policy", "latest_by_timestamp");
        let config = Config::from_source(&source).unwrap();
        assert_eq!(
            config.etl.user_conflict_policy,
            UserConflictPolicy::LatestByTimestamp
        );

        let source = complete_source().with("etl", "user_conflict_policy", "first_wins");
        assert!(Config::from_source(&source).is_err());
    }

    #[test]
    fn test_display_target_hides_password() {
        let config = Config::from_source(&complete_source()).unwrap();
        let target = config.cluster.display_target();
        assert_eq!(target, "dwhuser@localhost:5439/dwh");
        assert!(!target.contains("secret"));
    }

    fn complete_source() -> MapSource {
        MapSource::new()
            .with("cluster", "host", "localhost")
            .with("cluster", "db_name", "dwh")
            .with("cluster", "db_user", "dwhuser")
            .with("cluster", "db_password", "secret")
            .with("cluster", "db_port", "5439")
            .with("iam_role", "arn", "arn:aws:iam::123456789012:role/dwhRole")
            .with("s3", "log_data", "s3://udacity-dend/log_data")
            .with("s3", "song_data", "s3://udacity-dend/song_data")
    }
}
