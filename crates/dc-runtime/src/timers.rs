use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::pending::{pending_operation, Completer, PendingOperation};

/// The clock counts whole microseconds so repeated frame deltas add up exactly.
const TICKS_PER_SECOND: f64 = 1_000_000.0;

fn to_ticks(seconds: f64) -> u64 {
    (seconds * TICKS_PER_SECOND).round() as u64
}

#[derive(Debug)]
struct TimerEntry {
    due: u64,
    completer: Completer,
}

#[derive(Debug, Default)]
struct TimerQueue {
    now: u64,
    entries: Vec<TimerEntry>,
}

/// Frame-driven timers. The host advances them once per update; due timers
/// complete their operations in due order.
#[derive(Debug, Clone, Default)]
pub struct Timers {
    queue: Arc<Mutex<TimerQueue>>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, TimerQueue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns an operation that completes once `seconds` of updates have
    /// elapsed. Non-positive or non-finite durations complete immediately.
    pub fn schedule(&self, seconds: f64) -> PendingOperation {
        let (operation, completer) = pending_operation();
        if !seconds.is_finite() || seconds <= 0.0 {
            completer.complete();
            return operation;
        }
        let mut queue = self.lock();
        let due = queue.now.saturating_add(to_ticks(seconds).max(1));
        queue.entries.push(TimerEntry { due, completer });
        operation
    }

    /// Advances the clock and completes every timer now due. Returns how many
    /// fired.
    pub fn advance(&self, delta_seconds: f64) -> usize {
        let mut due = {
            let mut queue = self.lock();
            if delta_seconds.is_finite() && delta_seconds > 0.0 {
                queue.now = queue.now.saturating_add(to_ticks(delta_seconds));
            }
            let now = queue.now;
            let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut queue.entries)
                .into_iter()
                .partition(|entry| entry.due <= now);
            queue.entries = waiting;
            ready
        };
        due.sort_by_key(|entry| entry.due);
        let fired = due.len();
        for entry in due {
            entry.completer.complete();
        }
        fired
    }

    pub fn now(&self) -> f64 {
        self.lock().now as f64 / TICKS_PER_SECOND
    }

    pub fn pending_count(&self) -> usize {
        self.lock().entries.len()
    }
}
