//! Cancellable delayed work owned by a store.

use log::debug;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns timers scheduled by a store.
///
/// Dropping the scope or calling [`TaskScope::shutdown`] cancels every
/// pending task, so no callback fires after the owning store is gone.
#[derive(Debug, Default)]
pub struct TaskScope {
    token: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay` unless the scope is shut down first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.token.is_cancelled() {
            debug!("task scope shut down, dropping scheduled task");
            return;
        }
        let token = self.token.child_token();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => task(),
            }
        });
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(handle);
    }

    /// Number of scheduled tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.handles
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Cancel all pending tasks. Later `schedule` calls are ignored.
    pub fn shutdown(&self) {
        self.token.cancel();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        debug!("task scope shutdown (tasks={})", handles.len());
        for handle in handles {
            handle.abort();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::TaskScope;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn scheduled_task_fires_after_delay() {
        let scope = TaskScope::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        scope.schedule(Duration::from_millis(100), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(scope.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_and_drop_cancel_pending_tasks() {
        let hits = Arc::new(AtomicUsize::new(0));

        let scope = TaskScope::new();
        let counter = hits.clone();
        scope.schedule(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        scope.shutdown();
        let counter = hits.clone();
        scope.schedule(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(scope.is_shutdown());

        let dropped = TaskScope::new();
        let counter = hits.clone();
        dropped.schedule(Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(dropped);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
