//! Time sources and deferred execution.
//!
//! Every timer in the client (simulated replies, typing debounce) goes
//! through a [`Scheduler`], and every timestamp comes from a [`Clock`].
//! Production code uses [`TokioScheduler`] + [`SystemClock`]; tests use
//! [`ManualScheduler`], which is both, and only moves when told to.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tracing::trace;

/// A deferred callback. Fire-and-forget: there is no cancellation handle.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait Scheduler: Send + Sync {
    /// Run `task` once, after `delay`. Must not block the caller.
    fn schedule(&self, delay: Duration, task: Task);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ---------------------------------------------------------------------------
// Tokio
// ---------------------------------------------------------------------------

/// Spawns one sleeping task per scheduled callback on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime the caller is running on.
    pub fn current() -> Result<Self, tokio::runtime::TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}

// ---------------------------------------------------------------------------
// Virtual time
// ---------------------------------------------------------------------------

/// Deterministic scheduler driven by [`ManualScheduler::advance`].
///
/// Clones share the same timeline. Tasks fire in due-time order; tasks due at
/// the same instant fire in the order they were scheduled.
#[derive(Clone)]
pub struct ManualScheduler {
    inner: Arc<Mutex<Timeline>>,
}

struct Timeline {
    origin: DateTime<Utc>,
    elapsed: Duration,
    next_seq: u64,
    pending: BTreeMap<(Duration, u64), Task>,
}

impl ManualScheduler {
    /// Start a timeline at the current wall-clock instant.
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    pub fn starting_at(origin: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Timeline {
                origin,
                elapsed: Duration::ZERO,
                next_seq: 0,
                pending: BTreeMap::new(),
            })),
        }
    }

    fn timeline(&self) -> std::sync::MutexGuard<'_, Timeline> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move virtual time forward by `by`, running every task that comes due.
    /// Tasks scheduled by a running task are picked up if they fall inside
    /// the window. Returns the number of tasks run.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.timeline().elapsed + by;
        let mut ran = 0;

        loop {
            // Never hold the lock while a task runs: tasks may schedule more.
            let task = {
                let mut timeline = self.timeline();
                let due = match timeline.pending.keys().next() {
                    Some(&(due, seq)) if due <= target => (due, seq),
                    _ => break,
                };
                timeline.elapsed = due.0;
                timeline.pending.remove(&due)
            };

            if let Some(task) = task {
                task();
                ran += 1;
            }
        }

        self.timeline().elapsed = target;
        trace!(ran, "manual scheduler advanced");
        ran
    }

    /// Number of tasks waiting to fire.
    pub fn pending(&self) -> usize {
        self.timeline().pending.len()
    }

    /// Virtual time elapsed since the origin.
    pub fn elapsed(&self) -> Duration {
        self.timeline().elapsed
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        let mut timeline = self.timeline();
        let due = timeline.elapsed + delay;
        let seq = timeline.next_seq;
        timeline.next_seq += 1;
        timeline.pending.insert((due, seq), task);
    }
}

impl Clock for ManualScheduler {
    fn now(&self) -> DateTime<Utc> {
        let timeline = self.timeline();
        let offset = chrono::Duration::from_std(timeline.elapsed)
            .unwrap_or_else(|_| chrono::Duration::zero());
        timeline.origin + offset
    }
}
