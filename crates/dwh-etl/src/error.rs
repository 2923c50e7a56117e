//! Error types for the ETL library.

use thiserror::Error;

/// Exit code for configuration problems (missing keys, invalid values, bad YAML).
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Exit code when the warehouse cannot be reached.
pub const EXIT_CONNECTION_ERROR: u8 = 2;
/// Exit code when a bulk-load, insert or DDL statement fails.
pub const EXIT_STATEMENT_ERROR: u8 = 3;
/// Exit code for file system errors.
pub const EXIT_IO_ERROR: u8 = 7;

/// Main error type for ETL operations.
#[derive(Error, Debug)]
pub enum EtlError {
    /// A required configuration section/key is absent.
    #[error("Missing configuration value: [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    /// Configuration value present but invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The warehouse connection could not be established.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A named pipeline statement failed.
    #[error("Statement '{step}' on table {table} failed: {source}")]
    StatementExecution {
        step: String,
        table: String,
        #[source]
        source: Box<EtlError>,
    },

    /// Raw driver error from the warehouse.
    #[error("Warehouse error: {0}")]
    Warehouse(#[from] tokio_postgres::Error),

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A line of a local record file could not be parsed.
    #[error("Invalid record at {path}:{line}: {source}")]
    InvalidRecord {
        path: String,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

impl EtlError {
    /// Create a ConfigMissing error.
    pub fn missing(section: impl Into<String>, key: impl Into<String>) -> Self {
        EtlError::ConfigMissing {
            section: section.into(),
            key: key.into(),
        }
    }

    /// Wrap an error with the name and target table of the statement that raised it.
    pub fn statement(step: impl Into<String>, table: impl Into<String>, source: EtlError) -> Self {
        EtlError::StatementExecution {
            step: step.into(),
            table: table.into(),
            source: Box::new(source),
        }
    }

    /// Name of the failed statement, if this error came from one.
    pub fn failed_step(&self) -> Option<&str> {
        match self {
            EtlError::StatementExecution { step, .. } => Some(step),
            _ => None,
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            EtlError::ConfigMissing { .. }
            | EtlError::Config(_)
            | EtlError::Yaml(_)
            | EtlError::Json(_)
            | EtlError::InvalidRecord { .. } => EXIT_CONFIG_ERROR,
            EtlError::Connection(_) => EXIT_CONNECTION_ERROR,
            EtlError::StatementExecution { .. } | EtlError::Warehouse(_) => EXIT_STATEMENT_ERROR,
            EtlError::Io(_) => EXIT_IO_ERROR,
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for ETL operations.
pub type Result<T> = std::result::Result<T, EtlError>;
