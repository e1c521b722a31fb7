// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session change notifications.
//!
//! The cache publishes a [`SessionEvent`] after every successful mutation.
//! Delivery is synchronous and in subscription order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use prep_core::Session;

/// What changed in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Created(Session),
    /// `silent` marks background writes (autosave) that should not draw
    /// attention in the UI.
    Updated { session: Session, silent: bool },
    Deleted(String),
    /// One event for a batch; carries the input exactly as given.
    BatchUpdated(Vec<Session>),
}

impl SessionEvent {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Created(_) => "session_created",
            SessionEvent::Updated { .. } => "session_updated",
            SessionEvent::Deleted(_) => "session_deleted",
            SessionEvent::BatchUpdated(_) => "sessions_batch_updated",
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Observer registry for [`SessionEvent`]s.
#[derive(Default)]
pub struct EventBus {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, f: impl Fn(&SessionEvent) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(f)));
        id
    }

    /// Returns false if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Delivers `event` to everyone subscribed right now.
    ///
    /// The registry lock is released before delivery, so subscribers may
    /// subscribe or unsubscribe from inside the callback.
    pub fn publish(&self, event: &SessionEvent) {
        let snapshot: Vec<Subscriber> = self
            .subscribers
            .lock()
            .iter()
            .map(|(_, f)| Arc::clone(f))
            .collect();
        tracing::debug!(event = event.name(), subscribers = snapshot.len(), "publish");
        for subscriber in snapshot {
            subscriber(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
