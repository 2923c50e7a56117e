//! # dwh-etl
//!
//! Batch load of event-log and song-metadata JSON from S3 into a Redshift
//! star schema.
//!
//! A run has two phases over a single warehouse connection:
//!
//! - **Staging**: `COPY` the raw JSON into `staging_events` and `staging_songs`
//! - **Marts**: populate `songplays`, `users`, `songs`, `artists` and `time`
//!   from the staging tables
//!
//! Every statement is committed on its own; the first failure stops the run.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dwh_etl::{Config, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> dwh_etl::Result<()> {
//!     let config = Config::load("dwh.yaml")?;
//!     let orchestrator = Orchestrator::new(config)?;
//!     let result = orchestrator.run().await?;
//!     println!("Inserted {} rows", result.rows_inserted);
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod transform;
pub mod warehouse;

// Re-exports for convenient access
pub use catalog::{Catalog, Statement, StatementKind};
pub use config::{Config, ConfigSource, UserConflictPolicy};
pub use error::{EtlError, Result};
pub use orchestrator::{HealthCheckResult, Orchestrator, Phase, RunResult, TableCount};
pub use warehouse::{PgWarehouse, Warehouse};
