//! The single-winner acceptance lock and the dispatch worker lock
//! (`spec.md` §4.1, §4.3), both NX + TTL + check-and-delete over
//! `ride-store::LockStore`.

use ride_core::{DriverId, RideId};
use ride_store::LockStore;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const ACCEPT_LOCK_TTL: Duration = Duration::from_secs(15);
pub const WORKER_LOCK_TTL: Duration = Duration::from_secs(30);

fn accept_lock_key(ride_id: RideId) -> String {
    format!("ride_lock:{ride_id}")
}

fn worker_lock_key(ride_id: RideId) -> String {
    format!("dispatch_lock:{ride_id}")
}

/// A held acceptance lock. Dropping it without calling [`release`] leaves
/// the lock to expire by TTL, same as a crashed worker would — this is
/// deliberate: the lock's whole point is to survive a process death.
pub struct AcceptLockGuard {
    ride_id: RideId,
    driver_id: DriverId,
}

impl AcceptLockGuard {
    pub fn driver_id(&self) -> DriverId {
        self.driver_id
    }
}

pub struct Arbiter {
    locks: Arc<dyn LockStore>,
}

impl Arbiter {
    pub fn new(locks: Arc<dyn LockStore>) -> Self {
        Self { locks }
    }

    /// §4.3 step 1-2: atomically set `ride_lock:{rideId} := driverId` with
    /// NX + TTL 15s. Returns `None` if another driver already holds it
    /// (`rideError{code=RIDE_ALREADY_ACCEPTED}` at the caller).
    pub fn try_win_acceptance(&self, ride_id: RideId, driver_id: DriverId) -> Option<AcceptLockGuard> {
        let key = accept_lock_key(ride_id);
        if self.locks.try_acquire(&key, &driver_id.to_string(), ACCEPT_LOCK_TTL) {
            debug!(%ride_id, %driver_id, "acquired acceptance lock");
            Some(AcceptLockGuard { ride_id, driver_id })
        } else {
            debug!(%ride_id, %driver_id, "lost race for acceptance lock");
            None
        }
    }

    /// Releases the acceptance lock by check-and-delete, e.g. after a
    /// failed re-verify in §4.3 step 3 so another driver can win instead.
    pub fn release_acceptance(&self, guard: AcceptLockGuard) {
        debug!(ride_id = %guard.ride_id, driver_id = %guard.driver_id, "releasing acceptance lock early");
        self.locks.release_if_owner(&accept_lock_key(guard.ride_id), &guard.driver_id.to_string());
    }

    pub fn current_winner(&self, ride_id: RideId) -> Option<DriverId> {
        self.locks
            .holder(&accept_lock_key(ride_id))
            .and_then(|v| v.parse().ok())
            .map(DriverId::from_uuid)
    }

    /// §4.1: `dispatch_lock:{rideId}` NX + TTL 30s, preventing concurrent
    /// processing of the same ride across workers. `owner_token` identifies
    /// this worker instance (e.g. a per-process uuid).
    pub fn try_acquire_worker_lock(&self, ride_id: RideId, owner_token: &str) -> bool {
        self.locks.try_acquire(&worker_lock_key(ride_id), owner_token, WORKER_LOCK_TTL)
    }

    pub fn release_worker_lock(&self, ride_id: RideId, owner_token: &str) {
        self.locks.release_if_owner(&worker_lock_key(ride_id), owner_token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ride_store::InMemoryLockStore;

    #[test]
    fn only_one_driver_wins_acceptance() {
        let arbiter = Arbiter::new(Arc::new(InMemoryLockStore::new()));
        let ride_id = RideId::new();
        let d1 = DriverId::new();
        let d2 = DriverId::new();

        let guard1 = arbiter.try_win_acceptance(ride_id, d1);
        let guard2 = arbiter.try_win_acceptance(ride_id, d2);

        assert!(guard1.is_some());
        assert!(guard2.is_none());
        assert_eq!(arbiter.current_winner(ride_id), Some(d1));
    }

    #[test]
    fn releasing_acceptance_lock_lets_another_driver_acquire_it() {
        let arbiter = Arbiter::new(Arc::new(InMemoryLockStore::new()));
        let ride_id = RideId::new();
        let d1 = DriverId::new();
        let d2 = DriverId::new();

        let guard1 = arbiter.try_win_acceptance(ride_id, d1).unwrap();
        arbiter.release_acceptance(guard1);

        assert!(arbiter.try_win_acceptance(ride_id, d2).is_some());
    }

    #[test]
    fn worker_lock_prevents_concurrent_dispatch_processing() {
        let arbiter = Arbiter::new(Arc::new(InMemoryLockStore::new()));
        let ride_id = RideId::new();
        assert!(arbiter.try_acquire_worker_lock(ride_id, "worker-a"));
        assert!(!arbiter.try_acquire_worker_lock(ride_id, "worker-b"));
        arbiter.release_worker_lock(ride_id, "worker-a");
        assert!(arbiter.try_acquire_worker_lock(ride_id, "worker-b"));
    }
}
