//! Distributed-lock abstraction (`spec.md` §6 persistence keys:
//! `ride_lock:{rideId}`, `dispatch_lock:{rideId}`, `user_active_ride:{userId}`).
//!
//! Every lock is acquired with a TTL and a value, and released only by the
//! holder that can prove ownership (check-and-delete), so one worker can
//! never erroneously release a lock another worker now owns. In a
//! horizontally-scaled deployment this trait is backed by a real
//! distributed cache (Redis `SET NX PX` + Lua check-and-delete); here it is
//! an in-process `DashMap`, which is the correct behavior for a single node
//! and the same API shape a cluster-aware implementation would expose.

use dashmap::DashMap;
use std::time::{Duration, Instant};

pub trait LockStore: Send + Sync {
    /// Atomically sets `key := value` if `key` is absent or already expired.
    /// Returns whether the lock was acquired.
    fn try_acquire(&self, key: &str, value: &str, ttl: Duration) -> bool;

    /// Releases `key` only if its current value equals `value` (ownership
    /// check). Returns whether the release happened.
    fn release_if_owner(&self, key: &str, value: &str) -> bool;

    /// The current holder's value, if the lock is held and unexpired.
    fn holder(&self, key: &str) -> Option<String>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Default)]
pub struct InMemoryLockStore {
    entries: DashMap<String, Entry>,
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_live(entry: &Entry) -> bool {
        Instant::now() < entry.expires_at
    }
}

impl LockStore for InMemoryLockStore {
    fn try_acquire(&self, key: &str, value: &str, ttl: Duration) -> bool {
        use dashmap::mapref::entry::Entry as DEntry;
        match self.entries.entry(key.to_string()) {
            DEntry::Vacant(v) => {
                v.insert(Entry { value: value.to_string(), expires_at: Instant::now() + ttl });
                true
            }
            DEntry::Occupied(mut o) => {
                if Self::is_live(o.get()) {
                    false
                } else {
                    o.insert(Entry { value: value.to_string(), expires_at: Instant::now() + ttl });
                    true
                }
            }
        }
    }

    fn release_if_owner(&self, key: &str, value: &str) -> bool {
        if let Some(entry) = self.entries.get(key) {
            if entry.value != value {
                return false;
            }
        } else {
            return false;
        }
        // Re-check-and-remove under the entry API to avoid a TOCTOU window
        // between the read above and the removal.
        let removed = self.entries.remove_if(key, |_, entry| entry.value == value);
        removed.is_some()
    }

    fn holder(&self, key: &str) -> Option<String> {
        self.entries.get(key).filter(|e| Self::is_live(e)).map(|e| e.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_holds() {
        let store = InMemoryLockStore::new();
        assert!(store.try_acquire("ride_lock:1", "driver-a", Duration::from_secs(15)));
        assert!(!store.try_acquire("ride_lock:1", "driver-b", Duration::from_secs(15)));
    }

    #[test]
    fn expired_lock_can_be_reacquired() {
        let store = InMemoryLockStore::new();
        assert!(store.try_acquire("ride_lock:1", "driver-a", Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(store.try_acquire("ride_lock:1", "driver-b", Duration::from_secs(15)));
    }

    #[test]
    fn release_requires_ownership() {
        let store = InMemoryLockStore::new();
        store.try_acquire("ride_lock:1", "driver-a", Duration::from_secs(15));
        assert!(!store.release_if_owner("ride_lock:1", "driver-b"));
        assert!(store.release_if_owner("ride_lock:1", "driver-a"));
        assert!(store.holder("ride_lock:1").is_none());
    }
}
