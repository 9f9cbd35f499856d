use std::fmt;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use bb8::{Pool, PooledConnection};
use rusqlite::InterruptHandle;

use super::config::{SharedSqliteConnection, SqliteManager};
use super::query::{self, AbortFlag};
use super::reader::SqliteRows;
use crate::cancellation::Canceller;
use crate::command::Command;
use crate::driver::{DriverConnection, DriverRows};
use crate::error::DbAdapterError;
use crate::params::{CustomTypeParameterFactory, Parameter};
use crate::results::DataSet;
use crate::types::{ConnectionState, RowValues};

/// One `SQLite` connection slot: checked out of the pool on open, returned on close.
pub struct SqliteConnection {
    pool: Pool<SqliteManager>,
    conn: Option<PooledConnection<'static, SqliteManager>>,
    interrupt: Option<Arc<InterruptHandle>>,
    aborted: AbortFlag,
    command_timeout: Option<Duration>,
}

impl SqliteConnection {
    #[must_use]
    pub fn new(pool: Pool<SqliteManager>, command_timeout: Option<Duration>) -> Self {
        Self {
            pool,
            conn: None,
            interrupt: None,
            aborted: AbortFlag::default(),
            command_timeout,
        }
    }

    fn conn_handle(&self) -> Result<SharedSqliteConnection, DbAdapterError> {
        self.conn.as_ref().map(|c| Arc::clone(&**c)).ok_or_else(|| {
            DbAdapterError::ExecutionError("sqlite connection is not open".into())
        })
    }

    fn release(&mut self) {
        self.interrupt = None;
        self.conn = None;
    }
}

impl fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("state", &self.state())
            .field("pool", &self.pool.state())
            .field("command_timeout", &self.command_timeout)
            .finish()
    }
}

pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, DbAdapterError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, DbAdapterError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| DbAdapterError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

#[async_trait]
impl DriverConnection for SqliteConnection {
    fn state(&self) -> ConnectionState {
        if self.conn.is_some() {
            ConnectionState::Open
        } else {
            ConnectionState::Closed
        }
    }

    async fn open(&mut self) -> Result<(), DbAdapterError> {
        let conn = self.pool.get_owned().await.map_err(|e| {
            DbAdapterError::ConnectionError(format!("sqlite checkout error: {e}"))
        })?;
        let interrupt = conn.lock().await.get_interrupt_handle();
        self.interrupt = Some(Arc::new(interrupt));
        self.aborted = AbortFlag::default();
        self.conn = Some(conn);
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

    /// Raises the abort flag the worker checks before stepping, then interrupts any
    /// statement already running. `sqlite3_interrupt` alone is lost if nothing is stepping yet.
    fn canceller(&self) -> Canceller {
        match &self.interrupt {
            Some(handle) => {
                let handle = Arc::clone(handle);
                let aborted = Arc::clone(&self.aborted);
                Canceller::new(move || {
                    aborted.store(true, Ordering::SeqCst);
                    handle.interrupt();
                })
            }
            None => Canceller::noop(),
        }
    }

    fn default_command_timeout(&self) -> Option<Duration> {
        self.command_timeout
    }

    async fn execute_reader(
        &mut self,
        command: &Command,
    ) -> Result<Box<dyn DriverRows>, DbAdapterError> {
        let rows = SqliteRows::open(
            self.conn_handle()?,
            command.clone(),
            Arc::clone(&self.aborted),
        )
        .await?;
        Ok(Box::new(rows))
    }

    async fn execute_scalar(
        &mut self,
        command: &Command,
    ) -> Result<Option<RowValues>, DbAdapterError> {
        let command = command.clone();
        let aborted = Arc::clone(&self.aborted);
        run_blocking(self.conn_handle()?, move |conn| {
            query::scalar(conn, &command, &aborted)
        })
        .await
    }

    async fn execute_non_query(&mut self, command: &Command) -> Result<u64, DbAdapterError> {
        let command = command.clone();
        let aborted = Arc::clone(&self.aborted);
        run_blocking(self.conn_handle()?, move |conn| {
            query::non_query(conn, &command, &aborted)
        })
        .await
    }

    async fn fill(&mut self, command: &Command) -> Result<DataSet, DbAdapterError> {
        let command = command.clone();
        let aborted = Arc::clone(&self.aborted);
        run_blocking(self.conn_handle()?, move |conn| {
            query::fill(conn, &command, &aborted)
        })
        .await
    }
}

/// `SQLite` is dynamically typed, so type names are kept verbatim and never checked.
impl CustomTypeParameterFactory for SqliteConnection {
    fn create_custom_parameter(&self, type_name: &str, name: &str, value: RowValues) -> Parameter {
        Parameter::custom(type_name, name, value)
    }
}
