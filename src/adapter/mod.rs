//! The adapter: one driver connection, opened on demand for each execution and always closed
//! before the call returns.
//!
//! Every execution borrows the adapter mutably, so at most one operation (including a live
//! [`RowReader`]) can touch its connection at a time. Use one adapter per unit of work.

mod dispose;
mod execute;
mod lifecycle;
mod reader;

pub use lifecycle::{close_if_needed, open_if_needed};
pub use reader::RowReader;

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::cancellation::{CancellationHandle, effective_token};
use crate::command::{Command, build_command};
use crate::config::AdapterOptions;
use crate::driver::DriverConnection;
use crate::error::DbAdapterError;
use crate::params::{CustomTypeParameterFactory, ParamSpec, Parameter, build_parameters};
use crate::types::{CommandKind, ConnectionState, DbType, ParameterDirection, RowValues};

/// Lifecycle of an adapter instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterState {
    /// Built, no operation has run yet.
    Created,
    /// At least one operation has run; the adapter is still usable.
    Active,
    /// Disposed; every operation fails with `DbAdapterError::Disposed`.
    Disposed,
}

/// Async data-access adapter over a single driver connection.
///
/// The connection stays closed between operations. Each execution opens it, runs the
/// command under one cancellation signal (the caller's token, or a default timeout when
/// none is given) and closes it again on every exit path, including errors, cancellation
/// and a dropped [`RowReader`].
///
/// # Examples
///
/// ```no_run
/// # use db_adapter::prelude::*;
/// # async fn run(cap: ConfigAndPool) -> Result<(), DbAdapterError> {
/// let mut adapter = cap.adapter();
/// let rows = adapter
///     .execute_non_query_text("DELETE FROM jobs WHERE done", None, CommandKind::Text, None)
///     .await?;
/// println!("removed {rows}");
/// # Ok(())
/// # }
/// ```
pub struct DatabaseAdapter<C: DriverConnection> {
    connection: Option<C>,
    state: AdapterState,
    command_timeout: i32,
    cancel_after: Duration,
}

impl<C: DriverConnection> std::fmt::Debug for DatabaseAdapter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseAdapter")
            .field("state", &self.state)
            .field("connection_state", &self.connection_state())
            .field("command_timeout", &self.command_timeout)
            .field("cancel_after", &self.cancel_after)
            .finish()
    }
}

impl<C: DriverConnection> DatabaseAdapter<C> {
    /// Create an adapter with the default options.
    #[must_use]
    pub fn new(connection: C) -> Self {
        Self::with_options(connection, AdapterOptions::default())
    }

    /// Create an adapter with explicit options.
    ///
    /// # Arguments
    ///
    /// * `connection` - The driver connection this adapter owns; it should start closed
    /// * `options` - Command timeout and default cancellation delay
    #[must_use]
    pub fn with_options(connection: C, options: AdapterOptions) -> Self {
        Self {
            connection: Some(connection),
            state: AdapterState::Created,
            command_timeout: options.command_timeout,
            cancel_after: options.cancel_after,
        }
    }

    #[must_use]
    pub fn state(&self) -> AdapterState {
        self.state
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.state == AdapterState::Disposed
    }

    /// Command timeout in seconds applied to commands this adapter builds.
    #[must_use]
    pub fn command_timeout(&self) -> i32 {
        self.command_timeout
    }

    pub fn set_command_timeout(&mut self, secs: i32) {
        self.command_timeout = secs;
    }

    /// Deadline used for calls that supply no cancellation token.
    #[must_use]
    pub fn cancel_after(&self) -> Duration {
        self.cancel_after
    }

    /// State of the underlying connection; `Closed` once disposed.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map_or(ConnectionState::Closed, DriverConnection::state)
    }

    /// Build a parameter with a native type tag.
    ///
    /// # Errors
    /// Returns `DbAdapterError::Disposed` after disposal.
    pub fn create_parameter(
        &self,
        name: &str,
        db_type: DbType,
        value: RowValues,
        direction: ParameterDirection,
    ) -> Result<Parameter, DbAdapterError> {
        self.ensure_usable()?;
        Ok(Parameter::with_direction(name, db_type, value, direction))
    }

    /// Build input parameters from records, in order.
    ///
    /// # Errors
    /// Returns `DbAdapterError::Disposed` after disposal.
    pub fn create_parameters(&self, specs: &[ParamSpec]) -> Result<Vec<Parameter>, DbAdapterError> {
        self.ensure_usable()?;
        Ok(build_parameters(specs))
    }

    /// Build a parameter typed by a driver-specific type name.
    ///
    /// # Errors
    /// Returns `DbAdapterError::Disposed` after disposal.
    pub fn create_custom_parameter(
        &self,
        type_name: &str,
        name: &str,
        value: RowValues,
    ) -> Result<Parameter, DbAdapterError>
    where
        C: CustomTypeParameterFactory,
    {
        self.ensure_usable()?;
        let conn = self.connection.as_ref().ok_or(DbAdapterError::Disposed)?;
        Ok(conn.create_custom_parameter(type_name, name, value))
    }

    /// Build a command carrying this adapter's command timeout.
    ///
    /// # Errors
    /// Returns `DbAdapterError::Disposed` after disposal.
    pub fn create_command(
        &self,
        text: &str,
        parameters: Option<&[Parameter]>,
        kind: CommandKind,
    ) -> Result<Command, DbAdapterError> {
        self.ensure_usable()?;
        Ok(build_command(text, parameters, kind, self.command_timeout))
    }

    /// Open the connection if it is closed. A second call is a no-op.
    ///
    /// # Errors
    /// Returns `DbAdapterError::ConnectionError` if the driver cannot connect, or
    /// `DbAdapterError::Disposed` after disposal.
    pub async fn open(&mut self, token: Option<CancellationToken>) -> Result<(), DbAdapterError> {
        let (cancellation, conn) = self.begin(token)?;
        open_if_needed(conn, &cancellation).await
    }

    /// Close the connection if it is open. A second call is a no-op.
    ///
    /// # Errors
    /// Propagates the driver's close failure, or `DbAdapterError::Disposed` after disposal.
    pub async fn close(&mut self) -> Result<(), DbAdapterError> {
        self.ensure_usable()?;
        let conn = self.connection.as_mut().ok_or(DbAdapterError::Disposed)?;
        close_if_needed(conn).await
    }

    pub(crate) fn ensure_usable(&self) -> Result<(), DbAdapterError> {
        if self.state == AdapterState::Disposed || self.connection.is_none() {
            return Err(DbAdapterError::Disposed);
        }
        Ok(())
    }

    /// Resolve the cancellation handle for one call and hand out the connection.
    pub(crate) fn begin(
        &mut self,
        token: Option<CancellationToken>,
    ) -> Result<(CancellationHandle, &mut C), DbAdapterError> {
        self.ensure_usable()?;
        let cancellation = effective_token(token, self.cancel_after);
        debug!(source = ?cancellation.source(), "cancellation armed");
        self.state = AdapterState::Active;
        let conn = self.connection.as_mut().ok_or(DbAdapterError::Disposed)?;
        Ok((cancellation, conn))
    }
}
