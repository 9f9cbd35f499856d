use std::time::Duration;

use async_trait::async_trait;

use crate::cancellation::Canceller;
use crate::command::Command;
use crate::driver::{DriverConnection, DriverRows};
use crate::error::DbAdapterError;
use crate::params::{CustomTypeParameterFactory, Parameter};
use crate::results::DataSet;
use crate::types::{ConnectionState, DatabaseType, RowValues};

#[cfg(feature = "postgres")]
use crate::postgres::PostgresConnection;
#[cfg(feature = "sqlite")]
use crate::sqlite::SqliteConnection;

/// A driver connection for whichever backend a `ConfigAndPool` was built for.
#[derive(Debug)]
pub enum AnyConnection {
    #[cfg(feature = "postgres")]
    Postgres(PostgresConnection),
    #[cfg(feature = "sqlite")]
    Sqlite(SqliteConnection),
}

impl AnyConnection {
    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        match self {
            #[cfg(feature = "postgres")]
            AnyConnection::Postgres(_) => DatabaseType::Postgres,
            #[cfg(feature = "sqlite")]
            AnyConnection::Sqlite(_) => DatabaseType::Sqlite,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $conn:ident => $body:expr) => {
        match $self {
            #[cfg(feature = "postgres")]
            AnyConnection::Postgres($conn) => $body,
            #[cfg(feature = "sqlite")]
            AnyConnection::Sqlite($conn) => $body,
        }
    };
}

#[async_trait]
impl DriverConnection for AnyConnection {
    fn state(&self) -> ConnectionState {
        dispatch!(self, conn => conn.state())
    }

    async fn open(&mut self) -> Result<(), DbAdapterError> {
        dispatch!(self, conn => conn.open().await)
    }

    async fn close(&mut self) -> Result<(), DbAdapterError> {
        dispatch!(self, conn => conn.close().await)
    }

    fn close_blocking(&mut self) -> Result<(), DbAdapterError> {
        dispatch!(self, conn => conn.close_blocking())
    }

    fn canceller(&self) -> Canceller {
        dispatch!(self, conn => conn.canceller())
    }

    fn default_command_timeout(&self) -> Option<Duration> {
        dispatch!(self, conn => conn.default_command_timeout())
    }

    async fn execute_reader(
        &mut self,
        command: &Command,
    ) -> Result<Box<dyn DriverRows>, DbAdapterError> {
        dispatch!(self, conn => conn.execute_reader(command).await)
    }

    async fn execute_scalar(
        &mut self,
        command: &Command,
    ) -> Result<Option<RowValues>, DbAdapterError> {
        dispatch!(self, conn => conn.execute_scalar(command).await)
    }

    async fn execute_non_query(&mut self, command: &Command) -> Result<u64, DbAdapterError> {
        dispatch!(self, conn => conn.execute_non_query(command).await)
    }

    async fn fill(&mut self, command: &Command) -> Result<DataSet, DbAdapterError> {
        dispatch!(self, conn => conn.fill(command).await)
    }
}

impl CustomTypeParameterFactory for AnyConnection {
    fn create_custom_parameter(&self, type_name: &str, name: &str, value: RowValues) -> Parameter {
        dispatch!(self, conn => conn.create_custom_parameter(type_name, name, value))
    }
}
