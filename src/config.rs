use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::DEFAULT_COMMAND_TIMEOUT_SECS;
use crate::error::DbAdapterError;

/// Default duration after which an execution without a caller token is cancelled.
pub const DEFAULT_CANCEL_AFTER: Duration = Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS as u64);

/// Per-adapter settings.
///
/// ```rust
/// use db_adapter::prelude::*;
///
/// let opts: AdapterOptions = serde_json::from_str(r#"{ "command_timeout": 45 }"#).unwrap();
/// assert_eq!(opts.command_timeout, 45);
/// assert_eq!(opts.cancel_after, DEFAULT_CANCEL_AFTER);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterOptions {
    /// Seconds; see [`crate::command::propagated_timeout`] for when it reaches the driver.
    pub command_timeout: i32,
    /// Deadline applied when a call supplies no cancellation token.
    pub cancel_after: Duration,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT_SECS,
            cancel_after: DEFAULT_CANCEL_AFTER,
        }
    }
}

impl AdapterOptions {
    #[must_use]
    pub fn builder() -> AdapterOptionsBuilder {
        AdapterOptionsBuilder::default()
    }
}

/// Fluent builder for [`AdapterOptions`].
#[derive(Debug, Clone, Default)]
pub struct AdapterOptionsBuilder {
    opts: AdapterOptions,
}

impl AdapterOptionsBuilder {
    #[must_use]
    pub fn command_timeout(mut self, secs: i32) -> Self {
        self.opts.command_timeout = secs;
        self
    }

    #[must_use]
    pub fn cancel_after(mut self, after: Duration) -> Self {
        self.opts.cancel_after = after;
        self
    }

    /// Validate and return the options.
    ///
    /// # Errors
    /// Returns `DbAdapterError::ConfigError` when `cancel_after` is zero.
    pub fn build(self) -> Result<AdapterOptions, DbAdapterError> {
        if self.opts.cancel_after.is_zero() {
            return Err(DbAdapterError::ConfigError(
                "cancel_after must be greater than zero".to_string(),
            ));
        }
        Ok(self.opts)
    }
}
