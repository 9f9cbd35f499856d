use std::future::Future;
use std::ops::Deref;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bb8::{ManageConnection, Pool};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, warn};

use crate::config::AdapterOptions;
use crate::error::DbAdapterError;
use crate::pool::{AdapterPool, ConfigAndPool};
use crate::types::DatabaseType;

const DEFAULT_POOL_SIZE: u32 = 10;

/// Options for configuring a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PostgresOptions {
    pub config: tokio_postgres::Config,
    pub pool_size: u32,
    /// Bound applied to commands that carry no timeout of their own.
    pub command_timeout: Option<Duration>,
}

impl PostgresOptions {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            config,
            pool_size: DEFAULT_POOL_SIZE,
            command_timeout: None,
        }
    }

    /// Parse a `postgres://` URL or a `key=value` connection string.
    ///
    /// # Errors
    /// Returns `DbAdapterError::ConfigError` if the string cannot be parsed.
    pub fn parse(conn_str: &str) -> Result<Self, DbAdapterError> {
        let config = conn_str
            .parse::<tokio_postgres::Config>()
            .map_err(|e| DbAdapterError::ConfigError(format!("invalid postgres config: {e}")))?;
        Ok(Self::new(config))
    }

    /// Check that the fields a connection needs are present.
    ///
    /// # Errors
    /// Returns `DbAdapterError::ConfigError` naming the first missing field.
    pub fn validate(&self) -> Result<(), DbAdapterError> {
        if self.config.get_dbname().is_none() {
            return Err(DbAdapterError::ConfigError("dbname is required".to_string()));
        }
        if self.config.get_hosts().is_empty() {
            return Err(DbAdapterError::ConfigError("host is required".to_string()));
        }
        if self.config.get_user().is_none() {
            return Err(DbAdapterError::ConfigError("user is required".to_string()));
        }
        Ok(())
    }
}

/// Fluent builder for `PostgreSQL` options.
#[derive(Debug, Clone)]
pub struct PostgresOptionsBuilder {
    opts: PostgresOptions,
}

impl PostgresOptionsBuilder {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self {
            opts: PostgresOptions::new(config),
        }
    }

    #[must_use]
    pub fn pool_size(mut self, pool_size: u32) -> Self {
        self.opts.pool_size = pool_size;
        self
    }

    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.opts.command_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn finish(self) -> PostgresOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` for `PostgreSQL`.
    ///
    /// # Errors
    /// Returns `DbAdapterError` if validation or pool creation fails.
    pub async fn build(self) -> Result<ConfigAndPool, DbAdapterError> {
        ConfigAndPool::new_postgres(self.finish()).await
    }
}

/// A pooled Postgres client.
///
/// Once a cancel request has been sent for this session the client is
/// reported broken, so the pool discards it instead of handing it to
/// another caller that a late `CancelRequest` could still reach.
pub struct PgClient {
    client: Client,
    cancel_sent: Arc<AtomicBool>,
}

impl PgClient {
    fn new(client: Client) -> Self {
        Self {
            client,
            cancel_sent: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag raised by the canceller before it contacts the server.
    pub(crate) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_sent)
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel_sent.load(Ordering::SeqCst)
    }
}

impl Deref for PgClient {
    type Target = Client;

    fn deref(&self) -> &Client {
        &self.client
    }
}

/// bb8 manager for Postgres clients.
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    /// Build a pool from this manager.
    ///
    /// Connections are made lazily on first checkout.
    #[must_use]
    pub fn build_pool(self, max_size: u32) -> Pool<PgManager> {
        Pool::builder()
            .max_size(max_size.max(1))
            .retry_connection(false)
            .build_unchecked(self)
    }
}

impl ManageConnection for PgManager {
    type Connection = PgClient;
    type Error = tokio_postgres::Error;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            debug!(
                hosts = ?cfg.get_hosts(),
                db = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "postgres connect start"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    warn!(error = %e, "postgres connection task ended with error");
                }
            });
            Ok(PgClient::new(client))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move { conn.simple_query("SELECT 1").await.map(|_| ()) }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        if conn.is_cancelled() {
            debug!("discarding postgres client after a cancel request");
            return true;
        }
        conn.is_closed()
    }
}

impl ConfigAndPool {
    #[must_use]
    pub fn postgres_builder(config: tokio_postgres::Config) -> PostgresOptionsBuilder {
        PostgresOptionsBuilder::new(config)
    }

    /// Asynchronous initializer for `ConfigAndPool` with Postgres.
    ///
    /// # Errors
    /// Returns `DbAdapterError::ConfigError` if required config fields are missing.
    #[allow(clippy::unused_async)]
    pub async fn new_postgres(opts: PostgresOptions) -> Result<Self, DbAdapterError> {
        opts.validate()?;
        let pool = PgManager::new(opts.config.clone()).build_pool(opts.pool_size);
        debug!(pool_size = opts.pool_size, "postgres pool ready");

        Ok(ConfigAndPool {
            pool: AdapterPool::Postgres(pool),
            db_type: DatabaseType::Postgres,
            adapter_options: AdapterOptions::default(),
            driver_timeout: opts.command_timeout,
        })
    }
}
