use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Pending,
    Completed,
    TimedOut,
}

type Continuation = Box<dyn FnOnce() + Send>;

struct OperationState {
    resolution: Resolution,
    continuation: Option<Continuation>,
    consumer_attached: bool,
    waiters: Vec<oneshot::Sender<Resolution>>,
}

fn lock(state: &Mutex<OperationState>) -> MutexGuard<'_, OperationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Consumer side of an in-flight command. Resolves once, either completed by
/// its [`Completer`] or timed out by the runner.
#[derive(Clone)]
pub struct PendingOperation {
    state: Arc<Mutex<OperationState>>,
}

/// Producer side; the command handler keeps this and calls `complete`.
pub struct Completer {
    state: Arc<Mutex<OperationState>>,
}

pub fn pending_operation() -> (PendingOperation, Completer) {
    let state = Arc::new(Mutex::new(OperationState {
        resolution: Resolution::Pending,
        continuation: None,
        consumer_attached: false,
        waiters: Vec::new(),
    }));
    (
        PendingOperation {
            state: Arc::clone(&state),
        },
        Completer { state },
    )
}

fn resolve(state: &Mutex<OperationState>, resolution: Resolution) -> bool {
    let (continuation, waiters) = {
        let mut guard = lock(state);
        if guard.resolution != Resolution::Pending {
            return false;
        }
        guard.resolution = resolution;
        (guard.continuation.take(), std::mem::take(&mut guard.waiters))
    };
    for waiter in waiters {
        let _ = waiter.send(resolution);
    }
    if let Some(continuation) = continuation {
        continuation();
    }
    true
}

impl PendingOperation {
    /// An operation that is already complete, for handlers that finish inline.
    pub fn completed() -> Self {
        let (operation, completer) = pending_operation();
        completer.complete();
        operation
    }

    pub fn resolution(&self) -> Resolution {
        lock(&self.state).resolution
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution() != Resolution::Pending
    }

    /// Future that resolves with the operation, for hosts driving commands
    /// from an async executor. Any number of these may be taken. Yields
    /// `Resolution::Pending` only if every handle is dropped unresolved.
    pub fn resolved(&self) -> impl Future<Output = Resolution> + Send + 'static {
        let (sender, receiver) = oneshot::channel();
        {
            let mut guard = lock(&self.state);
            match guard.resolution {
                Resolution::Pending => guard.waiters.push(sender),
                resolved => {
                    let _ = sender.send(resolved);
                }
            }
        }
        async move { receiver.await.unwrap_or(Resolution::Pending) }
    }

    /// Resolves a still-pending operation as timed out. Returns false if it had
    /// already resolved.
    pub fn time_out(&self) -> bool {
        resolve(&self.state, Resolution::TimedOut)
    }
}

impl fmt::Debug for PendingOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingOperation")
            .field("resolution", &self.resolution())
            .finish()
    }
}

impl Completer {
    /// Marks the operation complete and runs the attached continuation, if any.
    /// Returns false when the operation had already resolved.
    pub fn complete(self) -> bool {
        let resolved = resolve(&self.state, Resolution::Completed);
        if !resolved {
            tracing::debug!("completion arrived after the operation had already resolved");
        }
        resolved
    }
}

impl Drop for Completer {
    fn drop(&mut self) {
        if lock(&self.state).resolution == Resolution::Pending {
            tracing::warn!("completer dropped while its operation is still pending");
        }
    }
}

impl fmt::Debug for Completer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer")
            .field("resolution", &lock(&self.state).resolution)
            .finish()
    }
}

/// Runs `continuation` exactly once, after `operation` resolves. Returns false
/// without running it when there is no operation or a continuation is already
/// attached.
pub fn await_completion<F>(operation: Option<&PendingOperation>, continuation: F) -> bool
where
    F: FnOnce() + Send + 'static,
{
    let Some(operation) = operation else {
        tracing::warn!("cannot await completion of a missing pending operation");
        return false;
    };

    let run_now = {
        let mut guard = lock(&operation.state);
        if guard.consumer_attached {
            tracing::warn!("pending operation already has a continuation attached");
            return false;
        }
        guard.consumer_attached = true;
        if guard.resolution == Resolution::Pending {
            guard.continuation = Some(Box::new(continuation));
            None
        } else {
            Some(continuation)
        }
    };

    if let Some(continuation) = run_now {
        continuation();
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let captured = Arc::clone(&count);
        (count, move || {
            captured.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn continuation_waits_for_completion() {
        let (operation, completer) = pending_operation();
        let (count, continuation) = counter();
        assert!(await_completion(Some(&operation), continuation));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(completer.complete());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(operation.resolution(), Resolution::Completed);
    }

    #[test]
    fn already_resolved_operation_runs_continuation_immediately() {
        let operation = PendingOperation::completed();
        let (count, continuation) = counter();
        assert!(await_completion(Some(&operation), continuation));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_operation_never_runs_continuation() {
        let (count, continuation) = counter();
        assert!(!await_completion(None, continuation));
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn second_consumer_is_rejected() {
        let (operation, completer) = pending_operation();
        let (first, first_continuation) = counter();
        let (second, second_continuation) = counter();
        assert!(await_completion(Some(&operation), first_continuation));
        assert!(!await_completion(Some(&operation), second_continuation));
        completer.complete();
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn timeout_wins_over_late_completion() {
        let (operation, completer) = pending_operation();
        let (count, continuation) = counter();
        await_completion(Some(&operation), continuation);
        assert!(operation.time_out());
        assert!(!operation.time_out());
        assert!(!completer.complete());
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(operation.resolution(), Resolution::TimedOut);
    }

    #[test]
    fn completion_from_another_thread_runs_continuation() {
        let (operation, completer) = pending_operation();
        let (count, continuation) = counter();
        await_completion(Some(&operation), continuation);
        std::thread::spawn(move || {
            completer.complete();
        })
        .join()
        .expect("completer thread");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn resolved_future_waits_for_another_thread() {
        let (operation, completer) = pending_operation();
        let resolved = operation.resolved();
        let worker = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(10));
            completer.complete();
        });
        assert_eq!(block_on(resolved), Resolution::Completed);
        worker.join().expect("completer thread");
    }

    #[test]
    fn resolved_future_sees_timeouts_and_earlier_resolutions() {
        let (operation, _completer) = pending_operation();
        let first = operation.resolved();
        let second = operation.resolved();
        operation.time_out();
        assert_eq!(block_on(first), Resolution::TimedOut);
        assert_eq!(block_on(second), Resolution::TimedOut);
        assert_eq!(block_on(operation.resolved()), Resolution::TimedOut);

        let done = PendingOperation::completed();
        assert_eq!(block_on(done.resolved()), Resolution::Completed);
    }

    #[test]
    fn resolved_future_does_not_take_the_continuation_slot() {
        let (operation, completer) = pending_operation();
        let resolved = operation.resolved();
        let (count, continuation) = counter();
        assert!(await_completion(Some(&operation), continuation));
        completer.complete();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(block_on(resolved), Resolution::Completed);
    }

    #[test]
    fn dropped_handles_leave_the_future_pending() {
        let (operation, completer) = pending_operation();
        let resolved = operation.resolved();
        drop(operation);
        drop(completer);
        assert_eq!(block_on(resolved), Resolution::Pending);
    }
}
