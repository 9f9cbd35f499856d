use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bb8::{ManageConnection, Pool};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::AdapterOptions;
use crate::error::DbAdapterError;
use crate::pool::{AdapterPool, ConfigAndPool};
use crate::types::DatabaseType;

use super::connection::run_blocking;

/// A rusqlite connection shared between the async side and blocking workers.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

const DEFAULT_POOL_SIZE: u32 = 4;

/// Options for configuring a `SQLite` pool.
///
/// Every pooled connection opens `db_path` independently, so `:memory:` gives each
/// connection its own empty database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteOptions {
    pub db_path: String,
    pub pool_size: u32,
    /// Bound applied to commands that carry no timeout of their own.
    pub command_timeout: Option<Duration>,
}

impl SqliteOptions {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            db_path,
            pool_size: DEFAULT_POOL_SIZE,
            command_timeout: None,
        }
    }
}

/// Fluent builder for `SQLite` options.
#[derive(Debug, Clone)]
pub struct SqliteOptionsBuilder {
    opts: SqliteOptions,
}

impl SqliteOptionsBuilder {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self {
            opts: SqliteOptions::new(db_path),
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
    pub fn finish(self) -> SqliteOptions {
        self.opts
    }

    /// Build a `ConfigAndPool` for `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `DbAdapterError` if pool creation or the initial smoke test fails.
    pub async fn build(self) -> Result<ConfigAndPool, DbAdapterError> {
        ConfigAndPool::new_sqlite(self.finish()).await
    }
}

/// bb8 manager for rusqlite connections.
#[derive(Debug, Clone)]
pub struct SqliteManager {
    db_path: String,
}

impl SqliteManager {
    #[must_use]
    pub fn new(db_path: String) -> Self {
        Self { db_path }
    }

    /// Build a pool from this manager.
    ///
    /// # Errors
    /// Returns `DbAdapterError` if pool creation fails.
    pub async fn build_pool(self, max_size: u32) -> Result<Pool<SqliteManager>, DbAdapterError> {
        Pool::builder()
            .max_size(max_size.max(1))
            .retry_connection(false)
            .build(self)
            .await
            .map_err(|e| DbAdapterError::ConnectionError(format!("sqlite pool error: {e}")))
    }
}

impl ManageConnection for SqliteManager {
    type Connection = SharedSqliteConnection;
    type Error = DbAdapterError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let db_path = self.db_path.clone();
        async move {
            let conn = tokio::task::spawn_blocking(move || {
                let conn = rusqlite::Connection::open(&db_path)?;
                conn.execute_batch("PRAGMA journal_mode = WAL;")?;
                Ok::<_, DbAdapterError>(conn)
            })
            .await
            .map_err(|e| {
                DbAdapterError::ConnectionError(format!("sqlite spawn_blocking join error: {e}"))
            })??;
            Ok(Arc::new(Mutex::new(conn)))
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        let conn = Arc::clone(conn);
        async move {
            run_blocking(conn, |guard| {
                guard
                    .execute_batch("SELECT 1")
                    .map_err(DbAdapterError::SqliteError)
            })
            .await
        }
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

impl ConfigAndPool {
    #[must_use]
    pub fn sqlite_builder(db_path: String) -> SqliteOptionsBuilder {
        SqliteOptionsBuilder::new(db_path)
    }

    /// Asynchronous initializer for `ConfigAndPool` with `SQLite`.
    ///
    /// # Errors
    /// Returns `DbAdapterError::ConnectionError` if pool creation or the connection test fails.
    pub async fn new_sqlite(opts: SqliteOptions) -> Result<Self, DbAdapterError> {
        let pool = SqliteManager::new(opts.db_path.clone())
            .build_pool(opts.pool_size)
            .await?;

        {
            let conn = pool.get().await.map_err(|e| {
                DbAdapterError::ConnectionError(format!("sqlite checkout error: {e}"))
            })?;
            run_blocking(Arc::clone(&*conn), |guard| {
                guard
                    .execute_batch("SELECT 1")
                    .map_err(DbAdapterError::SqliteError)
            })
            .await
            .map_err(DbAdapterError::into_connectivity)?;
        }
        debug!(db_path = %opts.db_path, pool_size = opts.pool_size, "sqlite pool ready");

        Ok(ConfigAndPool {
            pool: AdapterPool::Sqlite(pool),
            db_type: DatabaseType::Sqlite,
            adapter_options: AdapterOptions::default(),
            driver_timeout: opts.command_timeout,
        })
    }
}
