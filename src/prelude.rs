//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::adapter::{AdapterState, DatabaseAdapter, RowReader, close_if_needed, open_if_needed};
pub use crate::cancellation::{
    CancellationHandle, CancellationSource, Canceller, cancellation_source, effective_token,
};
pub use crate::command::{
    Command, DEFAULT_COMMAND_TIMEOUT_SECS, UNSET_COMMAND_TIMEOUT, build_command, propagated_timeout,
};
pub use crate::config::{AdapterOptions, AdapterOptionsBuilder, DEFAULT_CANCEL_AFTER};
pub use crate::driver::{DriverConnection, DriverRows};
pub use crate::error::{CancelReason, DbAdapterError, ErrorKind};
pub use crate::params::{
    CustomTypeParameterFactory, ParamSpec, Parameter, ParameterType, build_parameters,
};
pub use crate::pool::{AdapterPool, AnyConnection, ConfigAndPool};
pub use crate::results::{CustomDbRow, DataSet, ResultSet, RowCursor};
pub use crate::types::{
    CommandKind, ConnectionState, DatabaseType, DbType, ParameterDirection, RowValues,
};
pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "postgres")]
pub use crate::postgres::{PostgresConnection, PostgresOptions, PostgresOptionsBuilder};
#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteOptions, SqliteOptionsBuilder};
