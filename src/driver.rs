//! The boundary between the adapter and a concrete database driver.
//!
//! A driver connection owns one physical (usually pooled) connection and knows how to run a
//! [`Command`] on it. The adapter decides when to open and close it and wraps every driver
//! call in cancellation; drivers never need to look at tokens or deadlines themselves.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::cancellation::Canceller;
use crate::command::Command;
use crate::error::DbAdapterError;
use crate::results::DataSet;
use crate::types::{ConnectionState, RowValues};

#[async_trait]
pub trait DriverConnection: Send {
    fn state(&self) -> ConnectionState;

    /// Acquire the physical connection. On failure the state must stay `Closed`.
    async fn open(&mut self) -> Result<(), DbAdapterError>;

    /// Release the physical connection.
    async fn close(&mut self) -> Result<(), DbAdapterError>;

    /// Release the physical connection without awaiting. Used from `Drop`.
    fn close_blocking(&mut self) -> Result<(), DbAdapterError>;

    /// Abort hook for whatever is executing on this connection right now.
    fn canceller(&self) -> Canceller;

    /// Timeout the driver applies when a command carries none. `None` waits indefinitely.
    fn default_command_timeout(&self) -> Option<Duration> {
        None
    }

    async fn execute_reader(
        &mut self,
        command: &Command,
    ) -> Result<Box<dyn DriverRows>, DbAdapterError>;

    /// First column of the first row; `None` when the result has no rows.
    async fn execute_scalar(
        &mut self,
        command: &Command,
    ) -> Result<Option<RowValues>, DbAdapterError>;

    async fn execute_non_query(&mut self, command: &Command) -> Result<u64, DbAdapterError>;

    /// Materialize every table the command produces.
    async fn fill(&mut self, command: &Command) -> Result<DataSet, DbAdapterError>;
}

/// A forward-only result being read from the driver.
#[async_trait]
pub trait DriverRows: Send {
    fn columns(&self) -> Arc<Vec<String>>;

    /// Replace `values` with the next row. Returns `false` once the result is exhausted.
    async fn read_into(&mut self, values: &mut Vec<RowValues>) -> Result<bool, DbAdapterError>;
}
