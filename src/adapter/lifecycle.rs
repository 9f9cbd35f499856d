use tracing::{debug, warn};

use crate::cancellation::{CancellationHandle, Canceller};
use crate::driver::DriverConnection;
use crate::error::DbAdapterError;
use crate::types::ConnectionState;

/// Open the connection unless it is already open.
///
/// Any failure, including the handle firing mid-open, surfaces as a connectivity error and
/// leaves the connection closed.
///
/// # Errors
/// Returns `DbAdapterError::ConnectionError`.
pub async fn open_if_needed<C>(
    conn: &mut C,
    cancellation: &CancellationHandle,
) -> Result<(), DbAdapterError>
where
    C: DriverConnection + ?Sized,
{
    if conn.state() == ConnectionState::Open {
        return Ok(());
    }
    if let Some(reason) = cancellation.reason() {
        return Err(DbAdapterError::ConnectionError(format!(
            "connection open aborted: {reason}"
        )));
    }
    let opened = tokio::select! {
        biased;
        reason = cancellation.cancelled() => Err(DbAdapterError::ConnectionError(format!(
            "connection open aborted: {reason}"
        ))),
        res = conn.open() => res.map_err(DbAdapterError::into_connectivity),
    };
    match opened {
        Ok(()) => {
            debug!("connection opened");
            Ok(())
        }
        Err(err) => {
            if conn.state() == ConnectionState::Open {
                if let Err(close_err) = conn.close_blocking() {
                    warn!(error = %close_err, "failed to release half-opened connection");
                }
            }
            Err(err)
        }
    }
}

/// Close the connection unless it is already closed.
///
/// # Errors
/// Propagates the driver's close failure.
pub async fn close_if_needed<C>(conn: &mut C) -> Result<(), DbAdapterError>
where
    C: DriverConnection + ?Sized,
{
    if conn.state() == ConnectionState::Closed {
        return Ok(());
    }
    conn.close().await?;
    debug!("connection closed");
    Ok(())
}

/// Scoped ownership of the adapter's connection for one execution.
///
/// [`ConnectionGuard::finish`] closes asynchronously on the normal paths. If the guard is
/// dropped first (the caller dropped the future, or abandoned a reader), `Drop` closes the
/// connection synchronously.
pub(crate) struct ConnectionGuard<'a, C: DriverConnection> {
    conn: &'a mut C,
    armed: bool,
}

impl<'a, C: DriverConnection> ConnectionGuard<'a, C> {
    pub(crate) fn new(conn: &'a mut C) -> Self {
        Self { conn, armed: true }
    }

    pub(crate) async fn open(&mut self, cancellation: &CancellationHandle) -> Result<(), DbAdapterError> {
        open_if_needed(&mut *self.conn, cancellation).await
    }

    pub(crate) fn connection(&mut self) -> &mut C {
        &mut *self.conn
    }

    pub(crate) fn canceller(&self) -> Canceller {
        self.conn.canceller()
    }

    /// Best-effort close; a failure is logged, never raised.
    pub(crate) async fn release(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if let Err(err) = close_if_needed(&mut *self.conn).await {
            warn!(error = %err, "failed to close connection after execution");
        }
    }

    /// Close, then hand back the execution's own result untouched.
    pub(crate) async fn finish<T>(
        mut self,
        result: Result<T, DbAdapterError>,
    ) -> Result<T, DbAdapterError> {
        self.release().await;
        result
    }
}

impl<C: DriverConnection> Drop for ConnectionGuard<'_, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if self.conn.state() == ConnectionState::Open {
            match self.conn.close_blocking() {
                Ok(()) => debug!("connection closed on early drop"),
                Err(err) => warn!(error = %err, "failed to close connection on early drop"),
            }
        }
    }
}
