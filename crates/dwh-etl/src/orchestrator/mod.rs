//! Run orchestrator - sequences the load phases against one connection.
//!
//! A run is strictly sequential:
//!
//! 1. **Staging**: each COPY runs and is committed on its own
//! 2. **Marts**: each fact/dimension INSERT runs and is committed on its own
//!
//! The first failing statement aborts the run. Statements committed before
//! it stay committed; nothing is rolled back or retried.

mod report;

pub use report::{HealthCheckResult, Phase, PhaseReport, RunResult, StepReport, TableCount};

use std::time::Instant;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, Statement, TABLES};
use crate::config::{Config, ConfigSource};
use crate::error::{EtlError, Result};
use crate::warehouse::{PgWarehouse, Warehouse};

/// Pipeline orchestrator.
pub struct Orchestrator {
    config: Config,
    catalog: Catalog,
}

impl Orchestrator {
    /// Create an orchestrator. Builds the catalog, so invalid configuration
    /// fails here, before any connection is opened.
    pub fn new(config: Config) -> Result<Self> {
        let catalog = Catalog::from_config(&config)?;
        Ok(Self { config, catalog })
    }

    /// Create an orchestrator from a configuration source.
    pub fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        Self::new(Config::from_source(source)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Open the warehouse connection described by the configuration.
    pub async fn connect(&self) -> Result<PgWarehouse> {
        PgWarehouse::connect(&self.config.cluster).await
    }

    /// Run the whole pipeline: connect, load staging, populate marts, disconnect.
    pub async fn run(&self) -> Result<RunResult> {
        let mut conn = self.connect().await?;
        let result = self.run_with(&mut conn).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to close warehouse connection: {}", e);
        }
        result
    }

    /// Run both phases against an already open connection.
    pub async fn run_with<W>(&self, conn: &mut W) -> Result<RunResult>
    where
        W: Warehouse + ?Sized,
    {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting ETL run: {}", run_id);

        let staging = self.load_staging(conn).await.inspect_err(|e| {
            error!("Run {} failed while loading staging tables: {}", run_id, e);
        })?;

        let marts = self.populate_marts(conn).await.inspect_err(|e| {
            error!("Run {} failed while populating tables: {}", run_id, e);
        })?;

        let completed_at = Utc::now();
        let duration_seconds = (completed_at - started_at).num_milliseconds() as f64 / 1000.0;

        let result = RunResult {
            run_id,
            status: "completed".to_string(),
            started_at,
            completed_at,
            duration_seconds,
            rows_staged: staging.rows(),
            rows_inserted: marts.rows(),
            phases: vec![staging, marts],
        };

        info!(
            "ETL run {}: {} rows staged, {} rows inserted in {:.1}s",
            result.status, result.rows_staged, result.rows_inserted, result.duration_seconds
        );

        Ok(result)
    }

    /// Bulk-load every staging table, committing after each load.
    pub async fn load_staging<W>(&self, conn: &mut W) -> Result<PhaseReport>
    where
        W: Warehouse + ?Sized,
    {
        execute_phase(Phase::Staging, self.catalog.copy_statements(), conn).await
    }

    /// Populate the fact and dimension tables, committing after each insert.
    pub async fn populate_marts<W>(&self, conn: &mut W) -> Result<PhaseReport>
    where
        W: Warehouse + ?Sized,
    {
        execute_phase(Phase::Marts, self.catalog.insert_statements(), conn).await
    }

    /// Drop and recreate every table.
    pub async fn create_tables<W>(&self, conn: &mut W) -> Result<PhaseReport>
    where
        W: Warehouse + ?Sized,
    {
        let statements: Vec<Statement> = self
            .catalog
            .drop_statements()
            .iter()
            .chain(self.catalog.create_statements())
            .cloned()
            .collect();
        execute_phase(Phase::Schema, &statements, conn).await
    }

    /// Count the rows of every table.
    pub async fn validate<W>(&self, conn: &mut W) -> Result<Vec<TableCount>>
    where
        W: Warehouse + ?Sized,
    {
        let mut counts = Vec::with_capacity(TABLES.len());
        for table in TABLES.iter() {
            let rows = conn.count_rows(table.name).await?;
            info!("{}: {} rows", table.name, rows);
            counts.push(TableCount {
                table: table.name.to_string(),
                rows,
            });
        }
        Ok(counts)
    }

    /// Test the warehouse connection.
    pub async fn health_check(&self) -> Result<HealthCheckResult> {
        let target = self.config.cluster.display_target();
        let started = Instant::now();

        let outcome = match self.connect().await {
            Ok(mut conn) => {
                let ping = conn.ping().await;
                if let Err(e) = conn.close().await {
                    warn!("Failed to close warehouse connection: {}", e);
                }
                ping
            }
            Err(e) => Err(e),
        };

        Ok(HealthCheckResult {
            target,
            connected: outcome.is_ok(),
            latency_ms: started.elapsed().as_millis() as u64,
            error: outcome.err().map(|e| e.to_string()),
        })
    }

    /// The statements a run would issue, in order, without connecting.
    pub fn plan(&self) -> Vec<(Phase, &Statement)> {
        let staging = self
            .catalog
            .copy_statements()
            .iter()
            .map(|s| (Phase::Staging, s));
        let marts = self
            .catalog
            .insert_statements()
            .iter()
            .map(|s| (Phase::Marts, s));
        staging.chain(marts).collect()
    }
}

/// Execute and commit each statement in order, stopping at the first failure.
async fn execute_phase<W>(phase: Phase, statements: &[Statement], conn: &mut W) -> Result<PhaseReport>
where
    W: Warehouse + ?Sized,
{
    info!("Phase {}: {} statements", phase, statements.len());
    let phase_started = Instant::now();
    let mut steps = Vec::with_capacity(statements.len());

    for statement in statements {
        let started = Instant::now();
        debug!("{}: {}", statement.name, statement.sql);

        let rows = match conn.execute(&statement.sql).await {
            Ok(rows) => rows,
            Err(e) => return Err(step_failed(statement, e)),
        };
        if let Err(e) = conn.commit().await {
            return Err(step_failed(statement, e));
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "{}: committed ({} rows, {}ms)",
            statement.name, rows, duration_ms
        );
        steps.push(StepReport {
            name: statement.name.clone(),
            table: statement.table.clone(),
            rows,
            duration_ms,
        });
    }

    Ok(PhaseReport {
        phase,
        steps,
        duration_ms: phase_started.elapsed().as_millis() as u64,
    })
}

fn step_failed(statement: &Statement, e: EtlError) -> EtlError {
    error!("{}: failed - {}", statement.name, e);
    EtlError::statement(&statement.name, &statement.table, e)
}
