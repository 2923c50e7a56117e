//! Validation and quoting of configured values substituted into statements.
//!
//! Redshift `COPY` accepts its source location, credentials, region and JSON
//! format only as string literals: they cannot be bound as parameters. Every
//! configured value that ends up in statement text goes through this module:
//!
//! 1. Shape checks per value kind (S3 URI, IAM role ARN, region)
//! 2. Rejection of NUL bytes, control characters and oversized values
//! 3. Escaping of quotes and backslashes inside a single-quoted literal

use crate::error::{EtlError, Result};

/// Upper bound on any substituted value.
const MAX_LITERAL_LENGTH: usize = 1024;

/// Reject values that cannot be safely embedded in a literal.
pub fn validate_literal(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(EtlError::Config(format!("{} cannot be empty", what)));
    }

    if value.contains('\0') {
        return Err(EtlError::Config(format!(
            "SECURITY: {} contains a null byte: {:?}",
            what, value
        )));
    }

    if value.chars().any(char::is_control) {
        return Err(EtlError::Config(format!(
            "SECURITY: {} contains control characters: {:?}",
            what, value
        )));
    }

    if value.len() > MAX_LITERAL_LENGTH {
        return Err(EtlError::Config(format!(
            "{} exceeds maximum length of {} bytes (got {} bytes)",
            what,
            MAX_LITERAL_LENGTH,
            value.len()
        )));
    }

    Ok(())
}

/// Render a value as a single-quoted SQL string literal.
///
/// ```ignore
/// assert_eq!(quote_literal("auto")?, "'auto'");
/// assert_eq!(quote_literal("it's")?, "'it''s'");
/// ```
pub fn quote_literal(value: &str) -> Result<String> {
    validate_literal("literal", value)?;
    Ok(format!(
        "'{}'",
        value.replace('\\', "\\\\").replace('\'', "''")
    ))
}

/// Validate an object storage location (`s3://bucket/prefix`).
pub fn validate_s3_uri(what: &str, value: &str) -> Result<()> {
    validate_literal(what, value)?;

    let rest = value.strip_prefix("s3://").ok_or_else(|| {
        EtlError::Config(format!("{} must be an s3:// URI, got '{}'", what, value))
    })?;

    let bucket = rest.split('/').next().unwrap_or_default();
    if bucket.is_empty() {
        return Err(EtlError::Config(format!(
            "{} is missing a bucket name: '{}'",
            what, value
        )));
    }

    if value.chars().any(|c| c.is_whitespace() || c == '\'' || c == '\\') {
        return Err(EtlError::Config(format!(
            "{} contains whitespace, quotes or backslashes: '{}'",
            what, value
        )));
    }

    Ok(())
}

/// Validate an IAM role ARN (`arn:<partition>:iam::<account>:role/<name>`).
pub fn validate_role_arn(value: &str) -> Result<()> {
    validate_literal("iam_role.arn", value)?;

    let invalid = || {
        EtlError::Config(format!(
            "iam_role.arn must look like arn:aws:iam::<account-id>:role/<name>, got '{}'",
            value
        ))
    };

    let parts: Vec<&str> = value.splitn(6, ':').collect();
    let [arn, partition, service, region, account, resource] = parts.as_slice() else {
        return Err(invalid());
    };

    let role_name = resource.strip_prefix("role/").unwrap_or_default();
    let well_formed = *arn == "arn"
        && partition.starts_with("aws")
        && *service == "iam"
        && region.is_empty()
        && account.len() == 12
        && account.chars().all(|c| c.is_ascii_digit())
        && !role_name.is_empty()
        && role_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "+=,.@_-/".contains(c));

    if well_formed {
        Ok(())
    } else {
        Err(invalid())
    }
}

/// Validate the JSON format argument of COPY: `auto`, `auto ignorecase`, or a JSONPaths file.
pub fn validate_json_format(what: &str, value: &str) -> Result<()> {
    match value.to_lowercase().as_str() {
        "auto" | "auto ignorecase" => Ok(()),
        _ => validate_s3_uri(what, value),
    }
}

/// Validate an AWS region name.
pub fn validate_region(value: &str) -> Result<()> {
    validate_literal("s3.region", value)?;
    let ok = value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if ok {
        Ok(())
    } else {
        Err(EtlError::Config(format!(
            "s3.region must contain only lowercase letters, digits and dashes, got '{}'",
            value
        )))
    }
}
