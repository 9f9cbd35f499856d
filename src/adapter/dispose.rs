use tracing::{debug, warn};

use super::lifecycle::close_if_needed;
use super::{AdapterState, DatabaseAdapter};
use crate::driver::DriverConnection;
use crate::types::ConnectionState;

impl<C: DriverConnection> DatabaseAdapter<C> {
    /// Release the connection and mark the adapter disposed. Calling it again does nothing.
    ///
    /// A close failure is logged; disposal still completes.
    pub fn dispose(&mut self) {
        if self.state == AdapterState::Disposed {
            return;
        }
        self.state = AdapterState::Disposed;
        if let Some(mut conn) = self.connection.take() {
            if conn.state() == ConnectionState::Open {
                if let Err(err) = conn.close_blocking() {
                    warn!(error = %err, "failed to close connection during dispose");
                }
            }
        }
        debug!("adapter disposed");
    }

    /// Like [`DatabaseAdapter::dispose`], closing the connection asynchronously.
    pub async fn dispose_async(&mut self) {
        if self.state == AdapterState::Disposed {
            return;
        }
        self.state = AdapterState::Disposed;
        if let Some(mut conn) = self.connection.take() {
            if let Err(err) = close_if_needed(&mut conn).await {
                warn!(error = %err, "failed to close connection during dispose");
            }
        }
        debug!("adapter disposed");
    }
}

impl<C: DriverConnection> Drop for DatabaseAdapter<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
