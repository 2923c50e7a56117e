//! Configuration validation.

use super::Config;
use crate::catalog::literal;
use crate::error::{EtlError, Result};
use crate::warehouse::SslMode;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    // Cluster validation
    if config.cluster.host.is_empty() {
        return Err(EtlError::Config("cluster.host is required".into()));
    }
    if config.cluster.db_name.is_empty() {
        return Err(EtlError::Config("cluster.db_name is required".into()));
    }
    if config.cluster.db_user.is_empty() {
        return Err(EtlError::Config("cluster.db_user is required".into()));
    }
    if config.cluster.db_port == 0 {
        return Err(EtlError::Config("cluster.db_port must be non-zero".into()));
    }
    SslMode::parse(&config.cluster.ssl_mode)?;

    // Values substituted into COPY statements
    literal::validate_role_arn(&config.iam_role.arn)?;
    literal::validate_s3_uri("s3.log_data", &config.s3.log_data)?;
    literal::validate_s3_uri("s3.song_data", &config.s3.song_data)?;
    literal::validate_json_format("s3.log_jsonpath", &config.s3.log_jsonpath)?;
    literal::validate_region(&config.s3.region)?;

    Ok(())
}
