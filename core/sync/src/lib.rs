//! PipeStash change propagation.
//!
//! After a mutating remote operation updates the local index, the session
//! broadcasts through a [`SyncCoordinator`] and every registered
//! [`SyncObserver`] (file list, balance, previews) reloads independently.

pub mod coordinator;

pub use coordinator::{
    BroadcastReport, ObserverFailure, SubscriptionId, SyncCoordinator, SyncObserver,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let coordinator = SyncCoordinator::default();
        assert_eq!(coordinator.generation(), 0);
        assert_eq!(coordinator.observer_count(), 0);
    }
}
