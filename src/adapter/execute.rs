use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::lifecycle::ConnectionGuard;
use super::reader::RowReader;
use super::DatabaseAdapter;
use crate::cancellation::{CancellationHandle, run_cancellable};
use crate::command::{Command, execution_limit};
use crate::driver::DriverConnection;
use crate::error::DbAdapterError;
use crate::params::Parameter;
use crate::results::DataSet;
use crate::types::{CommandKind, RowValues};

impl<C: DriverConnection> DatabaseAdapter<C> {
    /// Execute a command and stream its rows.
    ///
    /// The connection stays open while the returned reader is alive and is closed when the
    /// reader is exhausted, fails, is cancelled, is closed, or is dropped.
    ///
    /// # Errors
    /// Returns a connectivity, query or cancellation error; the connection is closed first.
    pub async fn execute_reader(
        &mut self,
        command: &Command,
        token: Option<CancellationToken>,
    ) -> Result<RowReader<'_, C>, DbAdapterError> {
        let (cancellation, conn) = self.begin(token)?;
        debug!(kind = ?command.kind(), "executing reader");
        let limit = execution_limit(command, conn.default_command_timeout());
        let mut guard = ConnectionGuard::new(conn);
        let started: Result<_, DbAdapterError> = async {
            guard.open(&cancellation).await?;
            let canceller = guard.canceller();
            let rows = run_cancellable(
                &cancellation,
                &canceller,
                limit,
                guard.connection().execute_reader(command),
            )
            .await?;
            Ok((rows, canceller))
        }
        .await;
        match started {
            Ok((rows, canceller)) => Ok(RowReader::new(guard, rows, cancellation, canceller)),
            Err(err) => guard.finish(Err(err)).await,
        }
    }

    /// Build a command from text and parameters, then stream its rows.
    ///
    /// # Errors
    /// See [`DatabaseAdapter::execute_reader`].
    pub async fn execute_reader_text(
        &mut self,
        text: &str,
        parameters: Option<&[Parameter]>,
        kind: CommandKind,
        token: Option<CancellationToken>,
    ) -> Result<RowReader<'_, C>, DbAdapterError> {
        let command = self.create_command(text, parameters, kind)?;
        self.execute_reader(&command, token).await
    }

    /// Execute a command and return the first column of the first row.
    ///
    /// Returns `Ok(None)` when the result has no rows; a SQL `NULL` is `Some(RowValues::Null)`.
    ///
    /// # Errors
    /// Returns a connectivity, query or cancellation error; the connection is closed first.
    pub async fn execute_scalar(
        &mut self,
        command: &Command,
        token: Option<CancellationToken>,
    ) -> Result<Option<RowValues>, DbAdapterError> {
        let (cancellation, conn) = self.begin(token)?;
        debug!(kind = ?command.kind(), "executing scalar");
        let limit = execution_limit(command, conn.default_command_timeout());
        let mut guard = ConnectionGuard::new(conn);
        let result = async {
            guard.open(&cancellation).await?;
            let canceller = guard.canceller();
            run_cancellable(
                &cancellation,
                &canceller,
                limit,
                guard.connection().execute_scalar(command),
            )
            .await
        }
        .await;
        guard.finish(result).await
    }

    /// # Errors
    /// See [`DatabaseAdapter::execute_scalar`].
    pub async fn execute_scalar_text(
        &mut self,
        text: &str,
        parameters: Option<&[Parameter]>,
        kind: CommandKind,
        token: Option<CancellationToken>,
    ) -> Result<Option<RowValues>, DbAdapterError> {
        let command = self.create_command(text, parameters, kind)?;
        self.execute_scalar(&command, token).await
    }

    /// Execute a command and return the number of rows it affected.
    ///
    /// # Errors
    /// Returns a connectivity, query or cancellation error; the connection is closed first.
    pub async fn execute_non_query(
        &mut self,
        command: &Command,
        token: Option<CancellationToken>,
    ) -> Result<u64, DbAdapterError> {
        let (cancellation, conn) = self.begin(token)?;
        debug!(kind = ?command.kind(), "executing non-query");
        let limit = execution_limit(command, conn.default_command_timeout());
        let mut guard = ConnectionGuard::new(conn);
        let result = async {
            guard.open(&cancellation).await?;
            let canceller = guard.canceller();
            run_cancellable(
                &cancellation,
                &canceller,
                limit,
                guard.connection().execute_non_query(command),
            )
            .await
        }
        .await;
        guard.finish(result).await
    }

    /// # Errors
    /// See [`DatabaseAdapter::execute_non_query`].
    pub async fn execute_non_query_text(
        &mut self,
        text: &str,
        parameters: Option<&[Parameter]>,
        kind: CommandKind,
        token: Option<CancellationToken>,
    ) -> Result<u64, DbAdapterError> {
        let command = self.create_command(text, parameters, kind)?;
        self.execute_non_query(&command, token).await
    }

    /// Execute a command and materialize every table it returns.
    ///
    /// Takes no cancellation token and is not bounded by the default timeout; only the
    /// command timeout applies.
    ///
    /// # Errors
    /// Returns a connectivity or query error; the connection is closed first.
    pub async fn fill(&mut self, command: &Command) -> Result<DataSet, DbAdapterError> {
        self.ensure_usable()?;
        self.state = super::AdapterState::Active;
        let conn = self.connection.as_mut().ok_or(DbAdapterError::Disposed)?;
        debug!(kind = ?command.kind(), "executing fill");
        let limit = execution_limit(command, conn.default_command_timeout());
        let never = CancellationHandle::from_token(CancellationToken::new());
        let mut guard = ConnectionGuard::new(conn);
        let result = async {
            guard.open(&never).await?;
            let canceller = guard.canceller();
            run_cancellable(&never, &canceller, limit, guard.connection().fill(command)).await
        }
        .await;
        guard.finish(result).await
    }

    /// # Errors
    /// See [`DatabaseAdapter::fill`].
    pub async fn fill_text(
        &mut self,
        text: &str,
        parameters: Option<&[Parameter]>,
        kind: CommandKind,
    ) -> Result<DataSet, DbAdapterError> {
        let command = self.create_command(text, parameters, kind)?;
        self.fill(&command).await
    }
}
