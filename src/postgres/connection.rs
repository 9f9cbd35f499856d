use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use futures_util::StreamExt;
use tokio_postgres::types::ToSql;
use tokio_postgres::{CancelToken, NoTls, Statement};
use tracing::debug;

use super::config::PgManager;
use super::params::bound_values;
use super::query::{
    CallShape, PgRows, build_result_set_from_statement, column_names, postgres_extract_value,
    statement_text,
};
use crate::cancellation::Canceller;
use crate::command::Command;
use crate::driver::{DriverConnection, DriverRows};
use crate::error::DbAdapterError;
use crate::params::{CustomTypeParameterFactory, Parameter};
use crate::results::DataSet;
use crate::types::{ConnectionState, RowValues};

/// One Postgres connection slot: checked out of the pool on open, returned on close.
pub struct PostgresConnection {
    pool: Pool<PgManager>,
    client: Option<PooledConnection<'static, PgManager>>,
    cancel_token: Option<(CancelToken, Arc<AtomicBool>)>,
    command_timeout: Option<Duration>,
}

impl PostgresConnection {
    #[must_use]
    pub fn new(pool: Pool<PgManager>, command_timeout: Option<Duration>) -> Self {
        Self {
            pool,
            client: None,
            cancel_token: None,
            command_timeout,
        }
    }

    fn client(&self) -> Result<&tokio_postgres::Client, DbAdapterError> {
        self.client.as_deref().map(|c| &**c).ok_or_else(|| {
            DbAdapterError::ExecutionError("postgres connection is not open".into())
        })
    }

    async fn prepare(&self, command: &Command, shape: CallShape) -> Result<Statement, DbAdapterError> {
        let sql = statement_text(command, shape);
        Ok(self.client()?.prepare(&sql).await?)
    }

    fn release(&mut self) {
        self.cancel_token = None;
        self.client = None;
    }
}

impl fmt::Debug for PostgresConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConnection")
            .field("state", &self.state())
            .field("pool", &self.pool.state())
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

fn as_sql_refs<'a>(values: &'a [&'a RowValues]) -> Vec<&'a (dyn ToSql + Sync)> {
    values.iter().map(|v| *v as &(dyn ToSql + Sync)).collect()
}

#[async_trait]
impl DriverConnection for PostgresConnection {
    fn state(&self) -> ConnectionState {
        if self.client.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    async fn open(&mut self) -> Result<(), DbAdapterError> {
        let client = self.pool.get_owned().await.map_err(|e| {
            DbAdapterError::ConnectionError(format!("postgres checkout error: {e}"))
        })?;
        self.cancel_token = Some((client.cancel_token(), client.cancel_flag()));
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DbAdapterError> {
        self.release();
        Ok(())
    }

    fn close_blocking(&mut self) -> Result<(), DbAdapterError> {
        self.release();
        Ok(())
    }

    /// The session is flagged before the request goes out, so the pool
    /// never reuses a client a late `CancelRequest` might still hit.
    fn canceller(&self) -> Canceller {
        let Some((token, cancel_sent)) = self.cancel_token.clone() else {
            return Canceller::noop();
        };
        Canceller::new(move || {
            cancel_sent.store(true, Ordering::SeqCst);
            let token = token.clone();
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    if let Err(e) = token.cancel_query(NoTls).await {
                        debug!(error = %e, "postgres cancel request failed");
                    }
                });
            }
        })
    }

    fn default_command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }

    async fn execute_reader(
        &mut self,
        command: &Command,
    ) -> Result<Box<dyn DriverRows>, DbAdapterError> {
        let stmt = self.prepare(command, CallShape::Rows).await?;
        let values = bound_values(&stmt, command.parameters())?;
        let stream = self.client()?.query_raw(&stmt, values).await?;
        Ok(Box::new(PgRows::new(column_names(&stmt), stream)))
    }

    async fn execute_scalar(
        &mut self,
        command: &Command,
    ) -> Result<Option<RowValues>, DbAdapterError> {
        let stmt = self.prepare(command, CallShape::Rows).await?;
        let values = bound_values(&stmt, command.parameters())?;
        let mut stream = Box::pin(self.client()?.query_raw(&stmt, values).await?);
        match stream.next().await {
            Some(row) => {
                let row = row?;
                if row.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(postgres_extract_value(&row, 0)?))
                }
            }
            None => Ok(None),
        }
    }

    async fn execute_non_query(&mut self, command: &Command) -> Result<u64, DbAdapterError> {
        let stmt = self.prepare(command, CallShape::NonQuery).await?;
        let values = bound_values(&stmt, command.parameters())?;
        Ok(self.client()?.execute(&stmt, &as_sql_refs(&values)).await?)
    }

    async fn fill(&mut self, command: &Command) -> Result<DataSet, DbAdapterError> {
        let stmt = self.prepare(command, CallShape::Rows).await?;
        let values = bound_values(&stmt, command.parameters())?;
        let rows = self.client()?.query(&stmt, &as_sql_refs(&values)).await?;
        Ok(DataSet::from(build_result_set_from_statement(&stmt, &rows)?))
    }
}

/// Postgres folds unquoted type names to lower case, so the factory does too.
impl CustomTypeParameterFactory for PostgresConnection {
    fn create_custom_parameter(&self, type_name: &str, name: &str, value: RowValues) -> Parameter {
        Parameter::custom(type_name.to_lowercase(), name, value)
    }
}
