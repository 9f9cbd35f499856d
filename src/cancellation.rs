//! Cancellation and timeout coordination.
//!
//! Every execution runs under exactly one [`CancellationHandle`]. A caller token replaces the
//! default timeout entirely; without one, the handle is a deadline of the adapter's default
//! duration. When the handle fires, the driver's [`Canceller`] is asked to abort; that request
//! is advisory and the engine returns `Cancelled` without waiting for the driver to agree.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CancelReason, DbAdapterError};

/// Where an execution's cancellation signal comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationSource {
    Caller,
    Deadline(Duration),
}

/// Precedence rule: a caller token wins, otherwise the default duration becomes a deadline.
#[must_use]
pub fn cancellation_source(caller_supplied: bool, default_timeout: Duration) -> CancellationSource {
    if caller_supplied {
        CancellationSource::Caller
    } else {
        CancellationSource::Deadline(default_timeout)
    }
}

/// The single cancellation signal one execution observes: a caller token or a deadline.
#[derive(Debug, Clone)]
pub struct CancellationHandle {
    signal: Signal,
}

#[derive(Debug, Clone)]
enum Signal {
    Token(CancellationToken),
    Deadline { at: Instant, after: Duration },
}

impl CancellationHandle {
    /// Handle that only fires when `token` is cancelled.
    #[must_use]
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            signal: Signal::Token(token),
        }
    }

    /// Handle that fires once `after` has elapsed from now.
    #[must_use]
    pub fn with_timeout(after: Duration) -> Self {
        Self {
            signal: Signal::Deadline {
                at: Instant::now() + after,
                after,
            },
        }
    }

    #[must_use]
    pub fn source(&self) -> CancellationSource {
        match &self.signal {
            Signal::Token(_) => CancellationSource::Caller,
            Signal::Deadline { after, .. } => CancellationSource::Deadline(*after),
        }
    }

    /// Why the handle has fired, if it has.
    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        match &self.signal {
            Signal::Token(token) if token.is_cancelled() => Some(CancelReason::Caller),
            Signal::Deadline { at, after } if Instant::now() >= *at => {
                Some(CancelReason::DefaultTimeout(*after))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Resolves when the handle fires. Safe to call repeatedly.
    pub async fn cancelled(&self) -> CancelReason {
        match &self.signal {
            Signal::Token(token) => {
                token.cancelled().await;
                CancelReason::Caller
            }
            Signal::Deadline { at, after } => {
                tokio::time::sleep_until(*at).await;
                CancelReason::DefaultTimeout(*after)
            }
        }
    }

    /// Fail fast with `Cancelled` if the handle has already fired.
    ///
    /// # Errors
    /// Returns `DbAdapterError::Cancelled` carrying the reason.
    pub fn check(&self) -> Result<(), DbAdapterError> {
        match self.reason() {
            Some(reason) => Err(DbAdapterError::Cancelled(reason)),
            None => Ok(()),
        }
    }
}

/// Resolve the handle for one execution, following [`cancellation_source`].
#[must_use]
pub fn effective_token(caller: Option<CancellationToken>, default_timeout: Duration) -> CancellationHandle {
    match (cancellation_source(caller.is_some(), default_timeout), caller) {
        (CancellationSource::Caller, Some(token)) => CancellationHandle::from_token(token),
        (_, _) => CancellationHandle::with_timeout(default_timeout),
    }
}

/// Advisory abort hook for whatever the driver is currently executing.
#[derive(Clone)]
pub struct Canceller(Arc<dyn Fn() + Send + Sync>);

impl Canceller {
    pub fn new(abort: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(abort))
    }

    /// Canceller for drivers that cannot abort in-flight work.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(|| {})
    }

    pub fn cancel(&self) {
        (self.0)();
    }
}

impl fmt::Debug for Canceller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Canceller").field(&"<fn>").finish()
    }
}

/// Drive `fut` until it completes, the handle fires, or `limit` elapses.
///
/// On cancellation the canceller is invoked and `fut` is still driven until the driver
/// unwinds, so the connection is never released with work in flight. If the driver finishes
/// successfully despite the abort, its result stands; otherwise the call is `Cancelled`.
pub(crate) async fn run_cancellable<T, F>(
    handle: &CancellationHandle,
    canceller: &Canceller,
    limit: Option<Duration>,
    fut: F,
) -> Result<T, DbAdapterError>
where
    F: Future<Output = Result<T, DbAdapterError>>,
{
    handle.check()?;
    let command_deadline = async move {
        match limit {
            Some(after) => {
                tokio::time::sleep(after).await;
                after
            }
            None => std::future::pending().await,
        }
    };
    tokio::pin!(fut);
    let reason = tokio::select! {
        biased;
        reason = handle.cancelled() => reason,
        after = command_deadline => CancelReason::CommandTimeout(after),
        result = &mut fut => return result,
    };

    debug!(%reason, "aborting driver call");
    canceller.cancel();
    match fut.await {
        Ok(value) => {
            debug!(%reason, "driver call completed before the abort took effect");
            Ok(value)
        }
        Err(err) => {
            debug!(%reason, error = %err, "driver call unwound after abort");
            Err(DbAdapterError::Cancelled(reason))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn caller_token_replaces_default_timeout() {
        let d = Duration::from_secs(30);
        assert_eq!(cancellation_source(true, d), CancellationSource::Caller);
        assert_eq!(cancellation_source(false, d), CancellationSource::Deadline(d));
    }

    #[tokio::test]
    async fn caller_handle_ignores_default_duration() {
        let token = CancellationToken::new();
        let handle = effective_token(Some(token.clone()), Duration::from_millis(1));
        assert_eq!(handle.source(), CancellationSource::Caller);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!handle.is_cancelled());
        token.cancel();
        assert_eq!(handle.reason(), Some(CancelReason::Caller));
        assert_eq!(handle.cancelled().await, CancelReason::Caller);
    }

    #[tokio::test]
    async fn default_handle_fires_after_deadline() {
        let after = Duration::from_millis(10);
        let handle = effective_token(None, after);
        assert!(handle.check().is_ok());
        assert_eq!(handle.cancelled().await, CancelReason::DefaultTimeout(after));
        assert!(matches!(
            handle.check(),
            Err(DbAdapterError::Cancelled(CancelReason::DefaultTimeout(_)))
        ));
    }

    /// Canceller plus a future that only finishes once the canceller has fired.
    fn abortable(hits: &Arc<AtomicUsize>) -> (Canceller, CancellationToken) {
        let abort = CancellationToken::new();
        let seen = Arc::clone(hits);
        let trigger = abort.clone();
        let canceller = Canceller::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
            trigger.cancel();
        });
        (canceller, abort)
    }

    #[tokio::test]
    async fn run_cancellable_invokes_canceller_on_abort() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (canceller, abort) = abortable(&hits);
        let token = CancellationToken::new();
        let handle = CancellationHandle::from_token(token.clone());
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let res: Result<(), _> = run_cancellable(&handle, &canceller, None, async {
            abort.cancelled().await;
            Err(DbAdapterError::ExecutionError("statement aborted".into()))
        })
        .await;
        assert!(matches!(res, Err(DbAdapterError::Cancelled(CancelReason::Caller))));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_cancellable_waits_for_the_driver_to_unwind() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (canceller, abort) = abortable(&hits);
        let unwound = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&unwound);
        let handle = CancellationHandle::with_timeout(Duration::from_millis(10));
        let res: Result<(), _> = run_cancellable(&handle, &canceller, None, async move {
            abort.cancelled().await;
            tokio::time::sleep(Duration::from_millis(30)).await;
            seen.fetch_add(1, Ordering::SeqCst);
            Err(DbAdapterError::ExecutionError("statement aborted".into()))
        })
        .await;
        assert!(matches!(
            res,
            Err(DbAdapterError::Cancelled(CancelReason::DefaultTimeout(_)))
        ));
        assert_eq!(unwound.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn work_that_finishes_despite_the_abort_keeps_its_result() {
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = CancellationHandle::with_timeout(Duration::from_millis(10));
        let seen = Arc::clone(&hits);
        let canceller = Canceller::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        let res = run_cancellable(&handle, &canceller, None, async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok(3_u64)
        })
        .await;
        assert_eq!(res.unwrap(), 3);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_cancellable_enforces_command_limit() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (canceller, abort) = abortable(&hits);
        let handle = CancellationHandle::from_token(CancellationToken::new());
        let res: Result<(), _> = run_cancellable(
            &handle,
            &canceller,
            Some(Duration::from_millis(10)),
            async {
                tokio::select! {
                    () = abort.cancelled() => Err(DbAdapterError::ExecutionError("statement aborted".into())),
                    () = tokio::time::sleep(Duration::from_secs(5)) => Ok(()),
                }
            },
        )
        .await;
        assert!(matches!(
            res,
            Err(DbAdapterError::Cancelled(CancelReason::CommandTimeout(_)))
        ));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
