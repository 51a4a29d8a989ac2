//! In-process event bus for library activity.
//!
//! Handlers publish without waiting on consumers. The recorder task drains the
//! bus into the store so the activity feed and the permission audit log survive
//! restarts.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::store::Store;
use crate::types::{PermAudit, RepoCreated};

pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RepoCreated(RepoCreated),
    PermAudit(PermAudit),
}

#[derive(Debug, Clone)]
pub struct EventFrame {
    pub sequence: u64,
    pub event: Event,
}

#[derive(Debug)]
pub struct EventBus {
    tx: broadcast::Sender<EventFrame>,
    sequence: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventFrame> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Fire-and-forget. Having no subscribers is not an error.
    pub fn publish(&self, event: Event) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let _ = self.tx.send(EventFrame { sequence, event });
        sequence
    }
}

/// Persists every published event until the bus is dropped.
pub fn spawn_recorder(bus: &EventBus, store: Arc<dyn Store>) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(frame) => record(store.as_ref(), frame),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event recorder lagged; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
        tracing::debug!("event recorder stopped");
    })
}

fn record(store: &dyn Store, frame: EventFrame) {
    match frame.event {
        Event::RepoCreated(event) => {
            tracing::info!(
                sequence = frame.sequence,
                repo_id = %event.repo_id,
                creator = %event.creator,
                org_id = event.org_id,
                "library created"
            );
            if let Err(e) = store.record_repo_created(&event) {
                tracing::warn!("Failed to record library creation {}: {e}", event.repo_id);
            }
        }
        Event::PermAudit(audit) => {
            tracing::info!(
                sequence = frame.sequence,
                etype = %audit.etype,
                repo_id = %audit.repo_id,
                group_id = audit.group_id,
                "permission audit"
            );
            if let Err(e) = store.record_perm_audit(&audit) {
                tracing::warn!("Failed to record permission audit {}: {e}", audit.repo_id);
            }
        }
    }
}
