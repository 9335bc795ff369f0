//! Per-handle timeout timers
//!
//! One one-shot timer per handle. Firing runs the resolution closure the
//! coordinator armed it with, which goes through the same resolve-once path
//! as a manual cancel, so timeout and manual cancellation are observably
//! identical to the caller.

use crate::types::HandleId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Default)]
pub struct TimeoutController {
    timers: Arc<Mutex<HashMap<HandleId, JoinHandle<()>>>>,
}

impl TimeoutController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `on_fire` to run after `duration` unless disarmed first
    pub fn arm<F>(&self, id: HandleId, duration: Duration, on_fire: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let timers = Arc::clone(&self.timers);
        let task = tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            // Remove our own entry first so the resolution path's disarm
            // doesn't abort a timer that is already firing.
            timers.lock().remove(&id);
            debug!("Timeout fired for handle {}", id);
            on_fire();
        });
        self.timers.lock().insert(id, task);
    }

    /// Cancel the timer for `id`, if still armed
    pub fn disarm(&self, id: HandleId) {
        if let Some(task) = self.timers.lock().remove(&id) {
            task.abort();
        }
    }

    pub fn armed_count(&self) -> usize {
        self.timers.lock().len()
    }
}
