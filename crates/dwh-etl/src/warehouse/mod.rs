//! Warehouse connection capability.
//!
//! The orchestrator only needs to run statements and commit them, so the
//! connection is abstracted behind [`Warehouse`]. [`PgWarehouse`] is the
//! production implementation over the PostgreSQL wire protocol.

mod postgres;
mod tls;

pub use postgres::PgWarehouse;
pub use tls::SslMode;

use async_trait::async_trait;

use crate::error::Result;

/// A single, exclusively owned warehouse connection.
///
/// Statements run inside an implicit transaction that stays open until
/// [`commit`](Warehouse::commit) is called.
#[async_trait]
pub trait Warehouse: Send {
    /// Execute one statement, returning the number of rows affected.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    /// Commit the open transaction. No-op when none is open.
    async fn commit(&mut self) -> Result<()>;

    /// Count the rows of a table.
    async fn count_rows(&mut self, table: &str) -> Result<i64>;

    /// Round-trip a trivial query.
    async fn ping(&mut self) -> Result<()>;

    /// Release the connection. An uncommitted transaction is discarded.
    async fn close(&mut self) -> Result<()>;
}
