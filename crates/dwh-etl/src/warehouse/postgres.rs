//! Warehouse connection over the PostgreSQL wire protocol.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, Config as PgConfig, NoTls, SimpleQueryMessage};
use tracing::{debug, error, info, warn};

use super::tls::SslMode;
use super::Warehouse;
use crate::config::ClusterConfig;
use crate::error::{EtlError, Result};

/// Connect timeout for the warehouse endpoint.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A single Redshift/PostgreSQL connection.
///
/// Uses the simple query protocol: COPY and DDL take no bind parameters and
/// Redshift's extended-protocol support is incomplete.
pub struct PgWarehouse {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
    in_transaction: bool,
    target: String,
}

impl PgWarehouse {
    /// Open a connection to the configured cluster.
    pub async fn connect(config: &ClusterConfig) -> Result<Self> {
        let mut pg_config = PgConfig::new();
        pg_config
            .host(&config.host)
            .port(config.db_port)
            .dbname(&config.db_name)
            .user(&config.db_user)
            .password(&config.db_password)
            .keepalives(true)
            .keepalives_idle(Duration::from_secs(30))
            .connect_timeout(CONNECT_TIMEOUT)
            .application_name("dwh-etl");

        let target = config.display_target();
        let started = Instant::now();

        let (client, driver) = match SslMode::parse(&config.ssl_mode)?.connector()? {
            None => {
                warn!("Warehouse TLS is disabled. Credentials will be transmitted in plaintext.");
                let (client, connection) = pg_config
                    .connect(NoTls)
                    .await
                    .map_err(|e| connection_error(&target, e))?;
                (client, spawn_driver(connection))
            }
            Some(tls) => {
                let (client, connection) = pg_config
                    .connect(tls)
                    .await
                    .map_err(|e| connection_error(&target, e))?;
                (client, spawn_driver(connection))
            }
        };

        info!(
            "Connected to warehouse {} in {}ms",
            target,
            started.elapsed().as_millis()
        );

        Ok(Self {
            client: Some(client),
            driver: Some(driver),
            in_transaction: false,
            target,
        })
    }

    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| EtlError::Connection(format!("connection to {} is closed", self.target)))
    }
}

fn connection_error(target: &str, e: tokio_postgres::Error) -> EtlError {
    EtlError::Connection(format!("failed to connect to {}: {}", target, e))
}

fn spawn_driver<F>(connection: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = std::result::Result<(), tokio_postgres::Error>>
        + Send
        + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Warehouse connection error: {}", e);
        }
    })
}

/// Quote a table identifier.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn parse_count(table: &str, value: &str) -> Result<i64> {
    value.parse::<i64>().map_err(|_| {
        EtlError::statement(
            format!("{}_count", table),
            table,
            EtlError::Connection(format!("unexpected COUNT(*) reply '{}'", value)),
        )
    })
}

fn rows_affected(messages: &[SimpleQueryMessage]) -> u64 {
    messages
        .iter()
        .filter_map(|m| match m {
            SimpleQueryMessage::CommandComplete(n) => Some(*n),
            _ => None,
        })
        .sum()
}

#[async_trait]
impl Warehouse for PgWarehouse {
    async fn execute(&mut self, sql: &str) -> Result<u64> {
        if !self.in_transaction {
            self.client()?.batch_execute("BEGIN").await?;
            self.in_transaction = true;
        }

        let messages = self.client()?.simple_query(sql).await?;
        Ok(rows_affected(&messages))
    }

    async fn commit(&mut self) -> Result<()> {
        if self.in_transaction {
            self.client()?.batch_execute("COMMIT").await?;
            self.in_transaction = false;
        }
        Ok(())
    }

    async fn count_rows(&mut self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let messages = self.client()?.simple_query(&sql).await?;

        for message in &messages {
            if let SimpleQueryMessage::Row(row) = message {
                let value = row.get(0).unwrap_or("0");
                return parse_count(table, value);
            }
        }
        Ok(0)
    }

    async fn ping(&mut self) -> Result<()> {
        self.client()?.simple_query("SELECT 1").await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.in_transaction {
            debug!("Discarding uncommitted transaction on {}", self.target);
            self.in_transaction = false;
        }

        // Dropping the client ends the session; the driver task then finishes.
        drop(self.client.take());
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!("Warehouse connection task failed: {}", e);
            }
        }

        debug!("Closed connection to {}", self.target);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("time"), "\"time\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("users", "104").unwrap(), 104);

        let err = parse_count("users", "n/a").unwrap_err();
        assert_eq!(err.failed_step(), Some("users_count"));
        assert_eq!(err.exit_code(), crate::error::EXIT_STATEMENT_ERROR);
    }

    #[test]
    fn test_rows_affected_empty() {
        assert_eq!(rows_affected(&[]), 0);
    }

    #[tokio::test]
    async fn test_connect_refused_is_connection_error() {
        let config = ClusterConfig {
            host: "127.0.0.1".to_string(),
            db_name: "dwh".to_string(),
            db_user: "dwhuser".to_string(),
            db_password: "secret".to_string(),
            db_port: 1,
            ssl_mode: "disable".to_string(),
        };

        let err = PgWarehouse::connect(&config).await.err().unwrap();
        assert!(matches!(err, EtlError::Connection(_)));
        assert!(!err.to_string().contains("secret"));
    }
}
