//! Observable state containers and per-store status tracking.

use crate::events::{EventBus, StoreEvent, StoreKind};
use log::warn;
use parking_lot::Mutex;
use std::fmt::Display;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared value whose changes can be observed through a watch channel.
///
/// Clones share the same value. Closures passed to [`StateCell::read`] and
/// [`StateCell::update`] run under the channel lock and must not touch the
/// same cell again.
pub struct StateCell<T> {
    sender: Arc<watch::Sender<T>>,
}

impl<T> Clone for StateCell<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: Clone> StateCell<T> {
    pub fn new(initial: T) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Snapshot of the current value.
    pub fn get(&self) -> T {
        self.sender.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.sender.borrow())
    }

    /// Replace the value and notify observers. Returns the previous value.
    pub fn replace(&self, value: T) -> T {
        self.sender.send_replace(value)
    }

    /// Mutate in place and notify observers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut result = None;
        self.sender.send_modify(|value| result = Some(f(value)));
        match result {
            Some(result) => result,
            None => unreachable!("send_modify runs the closure exactly once"),
        }
    }

    /// Mutate in place, notifying observers only when `f` returns true.
    pub fn update_if(&self, f: impl FnOnce(&mut T) -> bool) -> bool {
        self.sender.send_if_modified(f)
    }

    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.sender.subscribe()
    }
}

impl<T: Clone + Default> Default for StateCell<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// Loading flag and last error of a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreStatus {
    /// True while at least one operation is outstanding.
    pub is_loading: bool,
    /// Message of the most recent failure, cleared when an operation starts.
    pub error: Option<String>,
}

/// Status cell that reports errors on the event bus.
pub(crate) struct StatusTracker {
    kind: StoreKind,
    state: StateCell<StoreStatus>,
    pending: Mutex<usize>,
    events: EventBus,
}

impl StatusTracker {
    pub(crate) fn new(kind: StoreKind, events: EventBus) -> Self {
        Self {
            kind,
            state: StateCell::new(StoreStatus::default()),
            pending: Mutex::new(0),
            events,
        }
    }

    pub(crate) fn snapshot(&self) -> StoreStatus {
        self.state.get()
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<StoreStatus> {
        self.state.subscribe()
    }

    /// Mark an operation as started: clears the error and raises the loading flag
    /// until the returned guard drops.
    pub(crate) fn begin(&self) -> LoadingGuard<'_> {
        let mut pending = self.pending.lock();
        *pending += 1;
        self.state.update(|status| {
            status.is_loading = true;
            status.error = None;
        });
        LoadingGuard { tracker: self }
    }

    /// Clear the error without touching the loading flag.
    pub(crate) fn clear_error(&self) {
        self.state.update_if(|status| status.error.take().is_some());
    }

    /// Record a failure and broadcast it.
    pub(crate) fn record(&self, operation: &str, err: &impl Display) {
        let message = err.to_string();
        warn!(
            "store operation failed, using local state (store={}, operation={}, error={})",
            self.kind.as_str(),
            operation,
            message
        );
        self.state
            .update(|status| status.error = Some(message.clone()));
        self.events.emit(StoreEvent::Error {
            store: self.kind,
            message,
        });
    }

    fn finish(&self) {
        let mut pending = self.pending.lock();
        *pending = pending.saturating_sub(1);
        let loading = *pending > 0;
        self.state
            .update_if(|status| std::mem::replace(&mut status.is_loading, loading) != loading);
    }
}

/// Keeps the loading flag raised while alive.
pub(crate) struct LoadingGuard<'a> {
    tracker: &'a StatusTracker,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.tracker.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::{StateCell, StatusTracker, StoreStatus};
    use crate::events::{EventBus, StoreEvent, StoreKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn state_cell_notifies_subscribers() {
        let cell = StateCell::new(vec![1]);
        let mut receiver = cell.subscribe();
        cell.update(|items| items.push(2));
        assert!(receiver.has_changed().expect("open"));
        assert_eq!(*receiver.borrow_and_update(), vec![1, 2]);

        assert!(!cell.update_if(|_| false));
        assert!(!receiver.has_changed().expect("open"));
        assert_eq!(cell.replace(Vec::new()), vec![1, 2]);
        assert!(cell.get().is_empty());
    }

    #[test]
    fn loading_stays_raised_until_last_guard_drops() {
        let tracker = StatusTracker::new(StoreKind::Agents, EventBus::default());
        let first = tracker.begin();
        let second = tracker.begin();
        drop(first);
        assert!(tracker.snapshot().is_loading);
        drop(second);
        assert_eq!(tracker.snapshot(), StoreStatus::default());
    }

    #[test]
    fn recorded_errors_are_broadcast_and_cleared_on_begin() {
        let events = EventBus::default();
        let mut receiver = events.subscribe();
        let tracker = StatusTracker::new(StoreKind::Chat, events);
        tracker.record("send_message", &"HTTP 500");
        assert_eq!(tracker.snapshot().error.as_deref(), Some("HTTP 500"));
        assert_eq!(
            receiver.try_recv().expect("event"),
            StoreEvent::Error {
                store: StoreKind::Chat,
                message: "HTTP 500".to_string()
            }
        );
        let _guard = tracker.begin();
        assert_eq!(tracker.snapshot().error, None);
    }
}
