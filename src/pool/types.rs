#[cfg(feature = "postgres")]
use crate::postgres::PgManager;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteManager;

/// Connection pool for database access
///
/// This enum wraps the bb8 pools of the supported database engines.
#[derive(Clone)]
pub enum AdapterPool {
    /// `PostgreSQL` connection pool
    #[cfg(feature = "postgres")]
    Postgres(bb8::Pool<PgManager>),
    /// `SQLite` connection pool
    #[cfg(feature = "sqlite")]
    Sqlite(bb8::Pool<SqliteManager>),
}

impl std::fmt::Debug for AdapterPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(feature = "postgres")]
            Self::Postgres(pool) => f.debug_tuple("Postgres").field(&pool.state()).finish(),
            #[cfg(feature = "sqlite")]
            Self::Sqlite(pool) => f.debug_tuple("Sqlite").field(&pool.state()).finish(),
        }
    }
}
