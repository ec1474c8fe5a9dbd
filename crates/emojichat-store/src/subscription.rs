//! Cancellable snapshot streams.

use tokio::sync::mpsc;

use crate::models::{CollectionPath, Snapshot};

type Cancel = Box<dyn FnOnce() + Send + 'static>;

/// Live view of one collection. The first snapshot describes the initial
/// state; every later one is the full collection after a change.
///
/// Delivery stops on [`Subscription::unsubscribe`] or when the value is
/// dropped.
pub struct Subscription {
    path: CollectionPath,
    rx: mpsc::UnboundedReceiver<Snapshot>,
    cancel: Option<Cancel>,
}

impl Subscription {
    pub fn new(
        path: CollectionPath,
        rx: mpsc::UnboundedReceiver<Snapshot>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            path,
            rx,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Wait for the next snapshot. `None` once the store side is gone.
    pub async fn recv(&mut self) -> Option<Snapshot> {
        self.rx.recv().await
    }

    /// Take the most recent queued snapshot without waiting. Older queued
    /// snapshots are superseded and skipped.
    pub fn try_latest(&mut self) -> Option<Snapshot> {
        let mut latest = None;
        while let Ok(snapshot) = self.rx.try_recv() {
            latest = Some(snapshot);
        }
        latest
    }

    pub fn unsubscribe(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
            self.rx.close();
            tracing::debug!(path = %self.path, "subscription closed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("path", &self.path)
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
