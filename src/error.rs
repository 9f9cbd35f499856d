use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Why an execution was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller-supplied token was cancelled.
    Caller,
    /// The adapter's default timeout elapsed (no caller token was supplied).
    DefaultTimeout(Duration),
    /// The command's own timeout elapsed while the driver was executing it.
    CommandTimeout(Duration),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Caller => f.write_str("cancelled by caller"),
            CancelReason::DefaultTimeout(after) => {
                write!(f, "default timeout of {}ms elapsed", after.as_millis())
            }
            CancelReason::CommandTimeout(after) => {
                write!(f, "command timeout of {}ms elapsed", after.as_millis())
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum DbAdapterError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Parameter conversion error: {0}")]
    ParameterError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(CancelReason),

    #[error("Adapter has been disposed and cannot be used")]
    Disposed,

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

/// Coarse classification callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The connection could not be opened.
    Connectivity,
    /// The driver rejected or failed the command.
    Query,
    /// The caller's token, the default timeout or the command timeout fired.
    Cancellation,
    /// The adapter was used after disposal.
    Disposed,
    /// Invalid adapter or driver configuration.
    Configuration,
}

impl DbAdapterError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbAdapterError::ConnectionError(_) => ErrorKind::Connectivity,
            DbAdapterError::Cancelled(_) => ErrorKind::Cancellation,
            DbAdapterError::Disposed => ErrorKind::Disposed,
            DbAdapterError::ConfigError(_) => ErrorKind::Configuration,
            #[cfg(feature = "sqlite")]
            DbAdapterError::SqliteError(_) => ErrorKind::Query,
            #[cfg(feature = "postgres")]
            DbAdapterError::PostgresError(_) => ErrorKind::Query,
            DbAdapterError::ParameterError(_)
            | DbAdapterError::ExecutionError(_)
            | DbAdapterError::Unimplemented(_) => ErrorKind::Query,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DbAdapterError::Cancelled(_))
    }

    /// Re-label any failure raised while opening as a connectivity failure.
    pub(crate) fn into_connectivity(self) -> Self {
        match self {
            DbAdapterError::ConnectionError(_) => self,
            other => DbAdapterError::ConnectionError(other.to_string()),
        }
    }
}
