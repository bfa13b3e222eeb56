//! Subscribers notified from the coordinator tick.
//!
//! The list is copy-on-write: notifying clones an `Arc` of the current list
//! and iterates it without holding the lock, so observers may subscribe or
//! unsubscribe while a notification is in flight.

use log::debug;
use parking_lot::RwLock;
use shared::GameEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Receives either a discrete event or `None`, meaning "state changed,
/// pull a fresh view".
pub trait Observer: Send + Sync {
    fn on_update(&self, event: Option<&GameEvent>);
}

impl Observer for UnboundedSender<Option<GameEvent>> {
    fn on_update(&self, event: Option<&GameEvent>) {
        // A closed receiver just means the subscriber went away
        if self.send(event.cloned()).is_err() {
            debug!("observer channel closed, dropping update");
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type ObserverList = Arc<Vec<(SubscriptionId, Arc<dyn Observer>)>>;

#[derive(Default)]
pub struct Subscribers {
    list: RwLock<ObserverList>,
    next_id: AtomicU64,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut list = self.list.write();
        let mut updated = Vec::with_capacity(list.len() + 1);
        updated.extend(list.iter().cloned());
        updated.push((id, observer));
        *list = Arc::new(updated);
        id
    }

    /// Returns false if the id was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut list = self.list.write();
        if !list.iter().any(|(existing, _)| *existing == id) {
            return false;
        }
        let updated: Vec<_> = list
            .iter()
            .filter(|(existing, _)| *existing != id)
            .cloned()
            .collect();
        *list = Arc::new(updated);
        true
    }

    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }

    pub fn notify(&self, event: Option<&GameEvent>) {
        let current = Arc::clone(&self.list.read());
        for (_, observer) in current.iter() {
            observer.on_update(event);
        }
    }
}
