//! Row streaming for `SQLite`.
//!
//! rusqlite rows borrow their statement, which borrows the connection, so the stream lives
//! on a blocking worker that owns the connection lock. The async side pulls one row at a
//! time over a demand channel; the worker never reads ahead. Each demand carries the buffer
//! the caller is done with, so two row buffers ping-pong between the sides.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use super::config::SharedSqliteConnection;
use super::query::{AbortFlag, column_names, ensure_not_aborted, prepare_bound, read_row_into};
use crate::command::Command;
use crate::driver::DriverRows;
use crate::error::DbAdapterError;
use crate::types::RowValues;

type RowMessage = Result<Option<Vec<RowValues>>, DbAdapterError>;

pub struct SqliteRows {
    columns: Arc<Vec<String>>,
    demand: Option<mpsc::Sender<Vec<RowValues>>>,
    rows: mpsc::Receiver<RowMessage>,
}

impl SqliteRows {
    /// Prepare the command on a worker and wait for its column header.
    pub(crate) async fn open(
        conn: SharedSqliteConnection,
        command: Command,
        aborted: AbortFlag,
    ) -> Result<Self, DbAdapterError> {
        let (header_tx, header_rx) = oneshot::channel();
        let (demand_tx, demand_rx) = mpsc::channel(1);
        let (row_tx, row_rx) = mpsc::channel(1);

        tokio::task::spawn_blocking(move || {
            let guard = conn.blocking_lock();
            stream_rows(&guard, &command, &aborted, header_tx, demand_rx, &row_tx);
        });

        let columns = header_rx.await.map_err(|e| {
            DbAdapterError::ExecutionError(format!("sqlite reader worker stopped: {e}"))
        })??;
        Ok(Self {
            columns: Arc::new(columns),
            demand: Some(demand_tx),
            rows: row_rx,
        })
    }
}

fn stream_rows(
    conn: &rusqlite::Connection,
    command: &Command,
    aborted: &AbortFlag,
    header: oneshot::Sender<Result<Vec<String>, DbAdapterError>>,
    mut demand: mpsc::Receiver<Vec<RowValues>>,
    rows: &mpsc::Sender<RowMessage>,
) {
    let prepared = ensure_not_aborted(aborted).and_then(|()| prepare_bound(conn, command));
    let mut stmt = match prepared {
        Ok(stmt) => stmt,
        Err(err) => {
            let _ = header.send(Err(err));
            return;
        }
    };
    let width = stmt.column_count();
    if header.send(Ok(column_names(&stmt))).is_err() {
        return;
    }

    let mut cursor = stmt.raw_query();
    while let Some(mut buffer) = demand.blocking_recv() {
        let next = match ensure_not_aborted(aborted) {
            Err(err) => Err(err),
            Ok(()) => match cursor.next() {
                Ok(Some(row)) => match read_row_into(row, width, &mut buffer) {
                    Ok(()) => Ok(Some(buffer)),
                    Err(err) => Err(err),
                },
                Ok(None) => Ok(None),
                Err(err) => Err(err.into()),
            },
        };
        let last = !matches!(next, Ok(Some(_)));
        if rows.blocking_send(next).is_err() || last {
            return;
        }
    }
}

#[async_trait]
impl DriverRows for SqliteRows {
    fn columns(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.columns)
    }

    async fn read_into(&mut self, values: &mut Vec<RowValues>) -> Result<bool, DbAdapterError> {
        let Some(demand) = self.demand.as_ref() else {
            return Ok(false);
        };
        let stopped = || DbAdapterError::ExecutionError("sqlite reader worker stopped".into());
        if demand.send(std::mem::take(values)).await.is_err() {
            self.demand = None;
            return Err(stopped());
        }
        match self.rows.recv().await {
            Some(Ok(Some(row))) => {
                *values = row;
                Ok(true)
            }
            Some(Ok(None)) => {
                self.demand = None;
                Ok(false)
            }
            Some(Err(err)) => {
                self.demand = None;
                Err(err)
            }
            None => {
                self.demand = None;
                Err(stopped())
            }
        }
    }
}
