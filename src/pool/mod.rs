pub mod connection;
pub mod types;

pub use connection::AnyConnection;
pub use types::AdapterPool;

use std::time::Duration;

use crate::adapter::DatabaseAdapter;
use crate::config::AdapterOptions;
use crate::types::DatabaseType;

#[cfg(feature = "postgres")]
use crate::postgres::PostgresConnection;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteConnection;

/// Configuration and connection pool for a database
///
/// Cloning is cheap: clones share the pool. Hand out one adapter per unit of work with
/// [`ConfigAndPool::adapter`].
#[derive(Clone, Debug)]
pub struct ConfigAndPool {
    /// The connection pool
    pub pool: AdapterPool,
    /// The database type
    pub db_type: DatabaseType,
    /// Options every adapter from this pool starts with
    pub adapter_options: AdapterOptions,
    /// Bound for commands that carry no timeout of their own
    pub driver_timeout: Option<Duration>,
}

impl ConfigAndPool {
    #[must_use]
    pub fn with_adapter_options(mut self, adapter_options: AdapterOptions) -> Self {
        self.adapter_options = adapter_options;
        self
    }

    /// A closed driver connection bound to this pool.
    #[must_use]
    pub fn connection(&self) -> AnyConnection {
        match &self.pool {
            #[cfg(feature = "postgres")]
            AdapterPool::Postgres(pool) => {
                AnyConnection::Postgres(PostgresConnection::new(pool.clone(), self.driver_timeout))
            }
            #[cfg(feature = "sqlite")]
            AdapterPool::Sqlite(pool) => {
                AnyConnection::Sqlite(SqliteConnection::new(pool.clone(), self.driver_timeout))
            }
        }
    }

    /// A fresh adapter for one unit of work.
    #[must_use]
    pub fn adapter(&self) -> DatabaseAdapter<AnyConnection> {
        DatabaseAdapter::with_options(self.connection(), self.adapter_options.clone())
    }
}
