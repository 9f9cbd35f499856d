//! Async data-access adapter over `SQLite` and `PostgreSQL`.
//!
//! A [`DatabaseAdapter`] owns one driver connection and runs commands in four shapes
//! (streaming reader, scalar, non-query, tabular fill). Each execution opens the connection
//! on demand and closes it before returning, on success, failure or cancellation alike.
//!
//! ```rust,no_run
//! use db_adapter::prelude::*;
//!
//! # async fn run() -> Result<(), DbAdapterError> {
//! let cap = ConfigAndPool::sqlite_builder("app.db".into()).build().await?;
//! let mut adapter = cap.adapter();
//! let params = adapter.create_parameters(&[ParamSpec::new("id", DbType::Int32, RowValues::Int(7))])?;
//! let touched = adapter
//!     .execute_non_query_text("UPDATE t SET x = 1 WHERE id = :id", Some(params.as_slice()), CommandKind::Text, None)
//!     .await?;
//! # let _ = touched;
//! adapter.dispose_async().await;
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod cancellation;
pub mod command;
pub mod config;
pub mod driver;
pub mod error;
pub mod params;
pub mod pool;
pub mod prelude;
pub mod results;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use adapter::{AdapterState, DatabaseAdapter, RowReader};
pub use error::{CancelReason, DbAdapterError, ErrorKind};
pub use pool::{AnyConnection, ConfigAndPool};
pub use tokio_util::sync::CancellationToken;
