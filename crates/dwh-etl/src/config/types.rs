//! Configuration type definitions.

use std::fmt;

use crate::error::{EtlError, Result};

/// Root configuration structure.
#[derive(Debug, Clone)]
pub struct Config {
    /// Warehouse cluster connection parameters.
    pub cluster: ClusterConfig,

    /// Role the warehouse assumes to read from object storage.
    pub iam_role: IamRoleConfig,

    /// Object storage locations of the source datasets.
    pub s3: S3Config,

    /// Transformation behavior.
    pub etl: EtlConfig,
}

/// Warehouse (Redshift) connection configuration.
#[derive(Clone)]
pub struct ClusterConfig {
    /// Cluster endpoint host.
    pub host: String,

    /// Database name.
    pub db_name: String,

    /// Username.
    pub db_user: String,

    /// Password.
    pub db_password: String,

    /// Port (Redshift default: 5439).
    pub db_port: u16,

    /// SSL mode (default: "require").
    pub ssl_mode: String,
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"[REDACTED]")
            .field("db_port", &self.db_port)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// IAM role delegated to the warehouse for S3 access.
#[derive(Debug, Clone)]
pub struct IamRoleConfig {
    /// Role ARN, e.g. `arn:aws:iam::123456789012:role/dwhRole`.
    pub arn: String,
}

/// Source dataset locations.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Prefix of the newline-delimited JSON event logs.
    pub log_data: String,

    /// JSONPaths descriptor for the event logs (default: "auto ignorecase").
    pub log_jsonpath: String,

    /// Prefix of the newline-delimited JSON song catalog.
    pub song_data: String,

    /// Bucket region passed to COPY (default: "us-west-2").
    pub region: String,
}

/// Transformation behavior configuration.
#[derive(Debug, Clone, Default)]
pub struct EtlConfig {
    /// How `users` handles one user seen with different attributes.
    pub user_conflict_policy: UserConflictPolicy,
}

/// Policy for users observed with differing attributes (typically `level`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserConflictPolicy {
    /// Keep every distinct attribute combination. A user whose level
    /// changed appears once per level.
    #[default]
    AllDistinct,

    /// Keep one row per user, taken from that user's most recent event.
    LatestByTimestamp,
}

impl UserConflictPolicy {
    /// Parse a policy name.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all_distinct" => Ok(Self::AllDistinct),
            "latest_by_timestamp" => Ok(Self::LatestByTimestamp),
            other => Err(EtlError::Config(format!(
                "Invalid etl.user_conflict_policy '{}'. Valid values: all_distinct, latest_by_timestamp",
                other
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllDistinct => "all_distinct",
            Self::LatestByTimestamp => "latest_by_timestamp",
        }
    }
}

pub(crate) fn default_require() -> String {
    "require".to_string()
}

/// Event log keys are camelCase while Redshift column names are lowercase.
pub(crate) fn default_events_json_format() -> String {
    "auto ignorecase".to_string()
}

pub(crate) fn default_region() -> String {
    "us-west-2".to_string()
}
