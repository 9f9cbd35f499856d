use std::sync::Arc;
use std::time::Duration;

use crate::params::Parameter;
use crate::types::CommandKind;

/// Command timeout every adapter starts with, in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: i32 = 30;

/// Sentinel meaning "no command timeout configured".
pub const UNSET_COMMAND_TIMEOUT: i32 = i32::MIN;

/// A logical request: text, parameters, kind and an optional timeout override.
///
/// Parameters are shared, never mutated after construction, so cloning a command is cheap.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    text: String,
    kind: CommandKind,
    parameters: Arc<[Parameter]>,
    timeout_secs: Option<u32>,
}

impl Command {
    /// Command with no parameters and the driver's default timeout.
    pub fn new(text: impl Into<String>, kind: CommandKind) -> Self {
        Self {
            text: text.into(),
            kind,
            parameters: Arc::from(Vec::new()),
            timeout_secs: None,
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: impl Into<Vec<Parameter>>) -> Self {
        self.parameters = Arc::from(parameters.into());
        self
    }

    /// Per-command timeout in seconds; `0` waits indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, secs: u32) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Timeout propagated to the driver, `None` when the driver's own default applies.
    #[must_use]
    pub fn timeout_secs(&self) -> Option<u32> {
        self.timeout_secs
    }
}

/// Timeout that a built command carries for a configured adapter timeout.
///
/// Only a non-negative value that differs from [`DEFAULT_COMMAND_TIMEOUT_SECS`] is propagated,
/// so resetting the adapter to the default hands control back to the driver.
#[must_use]
pub fn propagated_timeout(configured: i32) -> Option<u32> {
    if configured >= 0 && configured != DEFAULT_COMMAND_TIMEOUT_SECS {
        u32::try_from(configured).ok()
    } else {
        None
    }
}

/// Assemble a command from caller-supplied pieces.
///
/// `None` and an empty slice both yield a command without parameters.
#[must_use]
pub fn build_command(
    text: &str,
    parameters: Option<&[Parameter]>,
    kind: CommandKind,
    configured_timeout: i32,
) -> Command {
    let command = Command::new(text, kind);
    let command = match parameters {
        Some(params) if !params.is_empty() => command.with_parameters(params.to_vec()),
        _ => command,
    };
    match propagated_timeout(configured_timeout) {
        Some(secs) => command.with_timeout(secs),
        None => command,
    }
}

/// Bound on the driver call: the command's own timeout, else the driver default.
pub(crate) fn execution_limit(command: &Command, driver_default: Option<Duration>) -> Option<Duration> {
    match command.timeout_secs() {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(u64::from(secs))),
        None => driver_default.filter(|d| !d.is_zero()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DbType, RowValues};

    #[test]
    fn default_and_negative_timeouts_are_not_propagated() {
        assert_eq!(propagated_timeout(DEFAULT_COMMAND_TIMEOUT_SECS), None);
        assert_eq!(propagated_timeout(UNSET_COMMAND_TIMEOUT), None);
        assert_eq!(propagated_timeout(-1), None);
        assert_eq!(propagated_timeout(45), Some(45));
        assert_eq!(propagated_timeout(0), Some(0));
    }

    #[test]
    fn absent_and_empty_parameters_are_equivalent() {
        let absent = build_command("select 1", None, CommandKind::Text, 30);
        let empty = build_command("select 1", Some(&[]), CommandKind::Text, 30);
        assert_eq!(absent.parameters().len(), 0);
        assert_eq!(absent, empty);
    }

    #[test]
    fn built_command_keeps_parameter_order() {
        let params = vec![
            Parameter::new("a", DbType::Int64, RowValues::Int(1)),
            Parameter::new("b", DbType::Int64, RowValues::Int(2)),
        ];
        let cmd = build_command("dbo.sp", Some(&params), CommandKind::StoredProcedure, 45);
        assert_eq!(cmd.parameters(), params.as_slice());
        assert_eq!(cmd.kind(), CommandKind::StoredProcedure);
        assert_eq!(cmd.timeout_secs(), Some(45));
    }

    #[test]
    fn execution_limit_prefers_command_then_driver() {
        let driver = Some(Duration::from_secs(5));
        let plain = Command::new("x", CommandKind::Text);
        assert_eq!(execution_limit(&plain, driver), driver);
        assert_eq!(execution_limit(&plain, None), None);

        let explicit = plain.clone().with_timeout(2);
        assert_eq!(execution_limit(&explicit, driver), Some(Duration::from_secs(2)));

        let unbounded = plain.with_timeout(0);
        assert_eq!(execution_limit(&unbounded, driver), None);
    }
}
