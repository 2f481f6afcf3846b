//! Timer scheduling for hold and classification windows
//!
//! Timers never call back into recognizer state directly. A fired timer is
//! delivered as a message on the recognizer's own input queue, tagged with
//! the id it was armed with.

use std::collections::HashMap;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::trace;

use crate::events::Button;

use super::service::RecognizerInput;

/// What a timer decides when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    /// Confirms a long press
    Hold,
    /// Converts the accumulated press count into a gesture
    Classify,
}

/// Identity of one armed timer. The generation is unique per arm, so a
/// fire for a superseded timer is recognizable as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId {
    pub button: Button,
    pub purpose: TimerPurpose,
    pub generation: u64,
}

/// Scheduler-issued handle used for cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Errors that can occur when arming a timer
#[derive(Debug, thiserror::Error)]
pub enum TimerError {
    #[error("no async runtime available to drive timers")]
    NoRuntime,

    #[error("recognizer input queue is closed")]
    QueueClosed,
}

/// Delayed-callback facility consumed by the recognizer
pub trait TimerScheduler {
    /// Arrange for `id` to be delivered after `after` has elapsed
    fn schedule(&mut self, after: Duration, id: TimerId) -> Result<TimerHandle, TimerError>;

    /// Cancel a timer. Cancelling a timer that already fired only releases
    /// its bookkeeping.
    fn cancel(&mut self, handle: TimerHandle);
}

/// Tokio-backed scheduler feeding fired timers into the recognizer queue
pub struct TokioScheduler {
    queue: mpsc::WeakSender<RecognizerInput>,
    tasks: HashMap<TimerHandle, AbortHandle>,
    next_handle: u64,
}

impl TokioScheduler {
    /// Create a scheduler that delivers into `queue`. Only a weak reference
    /// is kept so pending timers never hold the queue open.
    pub fn new(queue: &mpsc::Sender<RecognizerInput>) -> Self {
        Self {
            queue: queue.downgrade(),
            tasks: HashMap::new(),
            next_handle: 0,
        }
    }

    /// Number of timers that have not yet fired or been cancelled
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|task| !task.is_finished()).count()
    }
}

impl TimerScheduler for TokioScheduler {
    fn schedule(&mut self, after: Duration, id: TimerId) -> Result<TimerHandle, TimerError> {
        let runtime = Handle::try_current().map_err(|_| TimerError::NoRuntime)?;
        if self.queue.upgrade().is_none() {
            return Err(TimerError::QueueClosed);
        }

        self.tasks.retain(|_, task| !task.is_finished());

        let queue = self.queue.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(queue) = queue.upgrade() {
                let _ = queue.send(RecognizerInput::Timer(id)).await;
            }
        });

        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.tasks.insert(handle, task.abort_handle());

        trace!(?id, ?after, handle = handle.0, "timer armed");
        Ok(handle)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
            trace!(handle = handle.0, "timer cancelled");
        }
    }
}
