//! Change broadcast for index observers.
//!
//! A payload-less "the index may have changed" signal. Observers register
//! explicitly and each performs its own full reload when signalled.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

use pipestash_common::Result;

/// Something that re-derives its state when the index changes.
///
/// Observers are idempotent best-effort re-renderers: each call should
/// reload from scratch rather than apply a diff.
#[async_trait]
pub trait SyncObserver: Send + Sync {
    /// Name used in logs and broadcast reports.
    fn name(&self) -> &str;

    /// Reload after a change.
    async fn on_sync(&self) -> Result<()>;
}

/// Identifies one registration with a [`SyncCoordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// An observer failure recorded during a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverFailure {
    pub observer: String,
    pub error: String,
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Generation number assigned to this broadcast.
    pub generation: u64,
    /// Observers that reloaded successfully.
    pub delivered: usize,
    /// Observers whose reload failed.
    pub failures: Vec<ObserverFailure>,
}

/// Broadcast signal owned by a session.
///
/// Delivery is sequential, in registration order. A failing observer is
/// logged and skipped; the remaining observers still run.
pub struct SyncCoordinator {
    observers: Mutex<Vec<(SubscriptionId, Arc<dyn SyncObserver>)>>,
    next_id: AtomicU64,
    generation: watch::Sender<u64>,
}

impl SyncCoordinator {
    /// Create a coordinator with no observers.
    pub fn new() -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            observers: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            generation,
        }
    }

    fn observers(&self) -> MutexGuard<'_, Vec<(SubscriptionId, Arc<dyn SyncObserver>)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an observer. It is called after all previously registered ones.
    pub fn subscribe(&self, observer: Arc<dyn SyncObserver>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!("Subscribed observer {} ({:?})", observer.name(), id);
        self.observers().push((id, observer));
        id
    }

    /// Remove a registration. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    /// Remove every registration.
    pub fn unsubscribe_all(&self) {
        self.observers().clear();
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    /// Number of broadcasts emitted so far.
    pub fn generation(&self) -> u64 {
        *self.generation.borrow()
    }

    /// Receiver that sees the generation bump on every broadcast.
    pub fn signal(&self) -> watch::Receiver<u64> {
        self.generation.subscribe()
    }

    /// Notify every observer that the index may have changed.
    ///
    /// Observers registered or removed while a broadcast is running take
    /// effect from the next broadcast.
    pub async fn broadcast(&self) -> BroadcastReport {
        let mut generation = 0;
        self.generation.send_modify(|g| {
            *g += 1;
            generation = *g;
        });

        let observers: Vec<Arc<dyn SyncObserver>> =
            self.observers().iter().map(|(_, o)| o.clone()).collect();
        debug!("Broadcast #{} to {} observers", generation, observers.len());

        let mut report = BroadcastReport {
            generation,
            delivered: 0,
            failures: Vec::new(),
        };
        for observer in observers {
            match observer.on_sync().await {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Observer {} failed to reload: {}", observer.name(), e);
                    report.failures.push(ObserverFailure {
                        observer: observer.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        report
    }
}

impl Default for SyncCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
