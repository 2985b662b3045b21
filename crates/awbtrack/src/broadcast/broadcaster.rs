use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::event::TrackEvent;

/// Where the engine sends its events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: TrackEvent);
}

pub type SubscriberId = u64;

/// Registry of connected viewers, each with its own bounded queue.
///
/// A viewer whose queue is full misses the event; a viewer whose receiver
/// was dropped is pruned on the next publish.
pub struct EventBroadcaster {
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<TrackEvent>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl EventBroadcaster {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> (SubscriberId, mpsc::Receiver<TrackEvent>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);
        self.write().insert(id, tx);
        log::debug!("Event subscriber {} connected", id);
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        if self.write().remove(&id).is_some() {
            log::debug!("Event subscriber {} disconnected", id);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.read().len()
    }

    /// Drops every subscriber queue. Receivers see the end of their stream
    /// once they have drained what was already queued.
    pub fn close_all(&self) -> usize {
        let mut subscribers = self.write();
        let count = subscribers.len();
        subscribers.clear();
        count
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<SubscriberId, mpsc::Sender<TrackEvent>>> {
        match self.subscribers.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Broadcaster registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<SubscriberId, mpsc::Sender<TrackEvent>>> {
        match self.subscribers.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Broadcaster registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for EventBroadcaster {
    fn publish(&self, event: TrackEvent) {
        // Deliver against a snapshot so viewers can come and go mid-publish.
        let snapshot: Vec<(SubscriberId, mpsc::Sender<TrackEvent>)> = self
            .read()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut closed = Vec::new();
        for (id, tx) in snapshot {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::trace!(
                        "Subscriber {} is lagging, dropped {} event for job {}",
                        id,
                        event.kind(),
                        event.job_id()
                    );
                }
                Err(TrySendError::Closed(_)) => closed.push(id),
            }
        }

        if !closed.is_empty() {
            let mut subscribers = self.write();
            for id in closed {
                subscribers.remove(&id);
            }
        }
    }
}
