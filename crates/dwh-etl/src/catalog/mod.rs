//! Schema/query catalog.
//!
//! The catalog holds every statement the pipeline issues, as named
//! [`Statement`]s grouped into four ordered sequences:
//!
//! - **drop**: `DROP TABLE IF EXISTS` for all seven tables
//! - **create**: `CREATE TABLE IF NOT EXISTS` with sort/dist hints
//! - **copy**: bulk loads of the two staging tables from S3
//! - **insert**: population of the fact and dimension tables from staging
//!
//! A catalog is built once from an immutable [`CatalogConfig`]; configured
//! values are validated and quoted at construction time, so a bad value
//! fails before any statement reaches the warehouse.

pub mod literal;
mod queries;
pub mod tables;

pub use tables::{TableDef, TableRole, TABLES};

use serde::Serialize;

use crate::config::{Config, UserConflictPolicy};
use crate::error::Result;
use tables::{ARTISTS, SONGPLAYS, SONGS, STAGING_EVENTS, STAGING_SONGS, TIME, USERS};

/// Kind of statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Drop,
    Create,
    Copy,
    Insert,
}

/// A named statement targeting one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    /// Step name used in logs and errors, e.g. `staging_events_copy`.
    pub name: String,
    /// Table the statement writes to.
    pub table: String,
    pub kind: StatementKind,
    pub sql: String,
}

impl Statement {
    fn new(table: &str, kind: StatementKind, sql: impl Into<String>) -> Self {
        let suffix = match kind {
            StatementKind::Drop => "drop",
            StatementKind::Create => "create",
            StatementKind::Copy => "copy",
            StatementKind::Insert => "insert",
        };
        Self {
            name: format!("{}_{}", table, suffix),
            table: table.to_string(),
            kind,
            sql: sql.into(),
        }
    }
}

/// Values substituted into the catalog's statements.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub log_data: String,
    pub log_jsonpath: String,
    pub song_data: String,
    pub region: String,
    pub iam_role_arn: String,
    pub user_conflict_policy: UserConflictPolicy,
}

impl From<&Config> for CatalogConfig {
    fn from(config: &Config) -> Self {
        Self {
            log_data: config.s3.log_data.clone(),
            log_jsonpath: config.s3.log_jsonpath.clone(),
            song_data: config.s3.song_data.clone(),
            region: config.s3.region.clone(),
            iam_role_arn: config.iam_role.arn.clone(),
            user_conflict_policy: config.etl.user_conflict_policy,
        }
    }
}

/// The statement catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    drops: Vec<Statement>,
    creates: Vec<Statement>,
    copies: Vec<Statement>,
    inserts: Vec<Statement>,
}

impl Catalog {
    /// Build the catalog, validating every substituted value.
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        literal::validate_s3_uri("s3.log_data", &config.log_data)?;
        literal::validate_s3_uri("s3.song_data", &config.song_data)?;
        literal::validate_json_format("s3.log_jsonpath", &config.log_jsonpath)?;
        literal::validate_role_arn(&config.iam_role_arn)?;
        literal::validate_region(&config.region)?;

        let drops = TABLES
            .iter()
            .map(|t| Statement::new(t.name, StatementKind::Drop, t.drop_sql()))
            .collect();

        let creates = TABLES
            .iter()
            .map(|t| Statement::new(t.name, StatementKind::Create, t.create_sql))
            .collect();

        let copies = vec![
            Statement::new(
                STAGING_EVENTS,
                StatementKind::Copy,
                queries::copy_json(
                    STAGING_EVENTS,
                    &config.log_data,
                    &config.iam_role_arn,
                    &config.region,
                    &config.log_jsonpath,
                )?,
            ),
            Statement::new(
                STAGING_SONGS,
                StatementKind::Copy,
                queries::copy_json(
                    STAGING_SONGS,
                    &config.song_data,
                    &config.iam_role_arn,
                    &config.region,
                    "auto",
                )?,
            ),
        ];

        // Fact table first; the five inserts only depend on staging.
        let inserts = vec![
            Statement::new(SONGPLAYS, StatementKind::Insert, queries::SONGPLAYS_INSERT),
            Statement::new(
                USERS,
                StatementKind::Insert,
                queries::users_insert(config.user_conflict_policy),
            ),
            Statement::new(SONGS, StatementKind::Insert, queries::SONGS_INSERT),
            Statement::new(ARTISTS, StatementKind::Insert, queries::ARTISTS_INSERT),
            Statement::new(TIME, StatementKind::Insert, queries::TIME_INSERT),
        ];

        Ok(Self {
            drops,
            creates,
            copies,
            inserts,
        })
    }

    /// Build the catalog from the full pipeline configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&CatalogConfig::from(config))
    }

    pub fn drop_statements(&self) -> &[Statement] {
        &self.drops
    }

    pub fn create_statements(&self) -> &[Statement] {
        &self.creates
    }

    /// Bulk loads, staging_events then staging_songs.
    pub fn copy_statements(&self) -> &[Statement] {
        &self.copies
    }

    /// Fact and dimension inserts, songplays first.
    pub fn insert_statements(&self) -> &[Statement] {
        &self.inserts
    }
}
