use tracing::debug;

use super::lifecycle::ConnectionGuard;
use crate::cancellation::{CancellationHandle, Canceller, run_cancellable};
use crate::driver::{DriverConnection, DriverRows};
use crate::error::DbAdapterError;
use crate::results::{CustomDbRow, RowCursor};

/// Forward-only stream of rows from [`crate::DatabaseAdapter::execute_reader`].
///
/// Holds the adapter's connection open until the stream ends. Exhaustion, a failed fetch, a
/// cancellation and [`RowReader::close`] all close it; dropping the reader closes it too.
pub struct RowReader<'a, C: DriverConnection> {
    // Field order matters: the driver stream must drop before the guard closes the connection.
    rows: Option<Box<dyn DriverRows>>,
    cursor: RowCursor,
    cancellation: CancellationHandle,
    canceller: Canceller,
    rows_read: usize,
    guard: ConnectionGuard<'a, C>,
}

impl<'a, C: DriverConnection> RowReader<'a, C> {
    pub(crate) fn new(
        guard: ConnectionGuard<'a, C>,
        rows: Box<dyn DriverRows>,
        cancellation: CancellationHandle,
        canceller: Canceller,
    ) -> Self {
        let cursor = RowCursor::new(rows.columns());
        Self {
            rows: Some(rows),
            cursor,
            cancellation,
            canceller,
            rows_read: 0,
            guard,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        self.cursor.column_names()
    }

    /// Rows delivered so far.
    #[must_use]
    pub fn rows_read(&self) -> usize {
        self.rows_read
    }

    /// True once the stream has ended and the connection has been released.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.rows.is_none()
    }

    /// Advance to the next row.
    ///
    /// Returns `Ok(None)` once the stream is exhausted, and on every call after that.
    ///
    /// # Errors
    /// Returns `DbAdapterError::Cancelled` if the call's cancellation fires, or the driver's
    /// error if the fetch fails. Either way the connection is closed and later calls return
    /// `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<&RowCursor>, DbAdapterError> {
        let Some(rows) = self.rows.as_mut() else {
            return Ok(None);
        };
        let fetched = run_cancellable(
            &self.cancellation,
            &self.canceller,
            None,
            rows.read_into(&mut self.cursor.values),
        )
        .await;
        match fetched {
            Ok(true) => {
                self.rows_read += 1;
                Ok(Some(&self.cursor))
            }
            Ok(false) => {
                debug!(rows = self.rows_read, "reader exhausted");
                self.release().await;
                Ok(None)
            }
            Err(err) => {
                debug!(rows = self.rows_read, error = %err, "reader aborted");
                self.release().await;
                Err(err)
            }
        }
    }

    /// Read every remaining row into owned rows.
    ///
    /// # Errors
    /// See [`RowReader::next`].
    pub async fn collect_rows(mut self) -> Result<Vec<CustomDbRow>, DbAdapterError> {
        let mut out = Vec::new();
        while let Some(cursor) = self.next().await? {
            out.push(cursor.to_row());
        }
        Ok(out)
    }

    /// Stop reading and close the connection.
    pub async fn close(mut self) {
        self.release().await;
    }

    async fn release(&mut self) {
        self.rows = None;
        self.cursor.values.clear();
        self.guard.release().await;
    }
}
