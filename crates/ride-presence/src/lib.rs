//! Driver presence + heartbeat registry (`spec.md` §4.6).
//!
//! Presence has two sources of truth: the durable `Driver` record
//! (authoritative on reconnection) and this hot cache, keyed `driver:{id}`
//! with a 60-second TTL, refreshed on every location update or heartbeat.
//! The Matcher reads the cache first and falls back to the durable record
//! on a miss.

use dashmap::DashMap;
use ride_core::{DriverId, Location, Timestamp};
use ride_store::RideStore;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct CachedPresence {
    pub socket_id: Option<String>,
    pub is_online: bool,
    pub is_active: bool,
    pub last_seen: Timestamp,
    pub location: Location,
}

struct CacheEntry {
    presence: CachedPresence,
    expires_at: Instant,
}

pub struct PresenceRegistry {
    cache: DashMap<DriverId, CacheEntry>,
    ttl: Duration,
    store: Arc<dyn RideStore>,
}

impl PresenceRegistry {
    pub fn new(store: Arc<dyn RideStore>, ttl: Duration) -> Self {
        Self { cache: DashMap::new(), ttl, store }
    }

    /// Refreshes the hot cache on a location update or heartbeat.
    pub fn heartbeat(&self, driver_id: DriverId, presence: CachedPresence) {
        self.cache.insert(driver_id, CacheEntry { presence, expires_at: Instant::now() + self.ttl });
    }

    /// Cache-first presence lookup, falling back to the durable record on a
    /// miss or expiry.
    pub fn lookup(&self, driver_id: DriverId) -> Option<CachedPresence> {
        if let Some(entry) = self.cache.get(&driver_id) {
            if Instant::now() < entry.expires_at {
                return Some(entry.presence.clone());
            }
        }
        let driver = self.store.get_driver(driver_id)?;
        Some(CachedPresence {
            socket_id: driver.socket_id,
            is_online: driver.is_online,
            is_active: driver.is_active,
            last_seen: driver.last_seen,
            location: driver.location,
        })
    }

    pub fn evict(&self, driver_id: DriverId) {
        self.cache.remove(&driver_id);
    }

    /// On reconnection with a new socket id, clear the old one from the
    /// durable record without forcibly disconnecting it (it may belong to
    /// another node in a sticky-session failure mode).
    pub fn reconnect(&self, driver_id: DriverId, new_socket_id: String, now: Timestamp) {
        if let Some(mut driver) = self.store.get_driver(driver_id) {
            driver.socket_id = Some(new_socket_id.clone());
            driver.is_online = true;
            driver.last_seen = now;
            self.repair_busy_flag(&mut driver);
            self.store.put_driver(driver.clone());
            self.heartbeat(
                driver_id,
                CachedPresence {
                    socket_id: Some(new_socket_id),
                    is_online: true,
                    is_active: driver.is_active,
                    last_seen: now,
                    location: driver.location,
                },
            );
        }
    }

    /// Explicit `driverDisconnect`: hard-reset the durable record and drop
    /// the cache entry.
    pub fn disconnect(&self, driver_id: DriverId) {
        if let Some(mut driver) = self.store.get_driver(driver_id) {
            driver.hard_reset_on_disconnect();
            self.store.put_driver(driver);
        }
        self.evict(driver_id);
        debug!(%driver_id, "driver disconnected, presence hard-reset");
    }

    /// Validation-and-repair: if the durable record claims `is_busy=true`
    /// but no ride in {accepted, arrived, in_progress} references this
    /// driver, clear the flag. Applied on reconnect and before every
    /// dispatch decision.
    pub fn repair_busy_flag(&self, driver: &mut ride_core::Driver) {
        if !driver.is_busy {
            return;
        }
        let has_live_ride = !self.store.active_rides_for_driver(driver.id).is_empty();
        if !has_live_ride {
            debug!(driver_id = %driver.id, "repairing stale is_busy flag, no live ride references this driver");
            driver.is_busy = false;
            driver.busy_until = None;
        }
    }

    /// Repairs and persists in one call, for use immediately before a
    /// dispatch decision.
    pub fn repair_and_persist(&self, driver_id: DriverId) -> Option<ride_core::Driver> {
        let mut driver = self.store.get_driver(driver_id)?;
        self.repair_busy_flag(&mut driver);
        self.store.put_driver(driver.clone());
        Some(driver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ride_store::MemRideStore;

    fn sample_driver(id: DriverId) -> ride_core::Driver {
        ride_core::Driver::new(
            id,
            Location { lng: 0.0, lat: 0.0 },
            ride_core::VehicleInfo { make: "Toyota".into(), model: "Prius".into(), plate: "P1".into() },
            1000,
        )
    }

    #[test]
    fn cache_hit_avoids_falling_back_to_store() {
        let store = Arc::new(MemRideStore::new());
        let registry = PresenceRegistry::new(store.clone(), Duration::from_secs(60));
        let driver_id = DriverId::new();
        registry.heartbeat(
            driver_id,
            CachedPresence {
                socket_id: Some("sock-1".into()),
                is_online: true,
                is_active: true,
                last_seen: 2000,
                location: Location { lng: 1.0, lat: 1.0 },
            },
        );
        let presence = registry.lookup(driver_id).unwrap();
        assert_eq!(presence.socket_id.as_deref(), Some("sock-1"));
    }

    #[test]
    fn expired_cache_falls_back_to_durable_record() {
        let store = Arc::new(MemRideStore::new());
        let driver_id = DriverId::new();
        store.put_driver(sample_driver(driver_id));
        let registry = PresenceRegistry::new(store, Duration::from_millis(1));
        registry.heartbeat(
            driver_id,
            CachedPresence {
                socket_id: Some("stale".into()),
                is_online: true,
                is_active: true,
                last_seen: 1,
                location: Location { lng: 0.0, lat: 0.0 },
            },
        );
        std::thread::sleep(Duration::from_millis(5));
        let presence = registry.lookup(driver_id).unwrap();
        assert_eq!(presence.socket_id, None);
    }

    #[test]
    fn repair_clears_busy_flag_with_no_live_ride() {
        let store = Arc::new(MemRideStore::new());
        let driver_id = DriverId::new();
        let mut driver = sample_driver(driver_id);
        driver.is_busy = true;
        store.put_driver(driver);
        let registry = PresenceRegistry::new(store.clone(), Duration::from_secs(60));
        let repaired = registry.repair_and_persist(driver_id).unwrap();
        assert!(!repaired.is_busy);
    }

    #[test]
    fn disconnect_hard_resets_and_evicts_cache() {
        let store = Arc::new(MemRideStore::new());
        let driver_id = DriverId::new();
        let mut driver = sample_driver(driver_id);
        driver.is_online = true;
        driver.is_busy = true;
        driver.socket_id = Some("sock".into());
        store.put_driver(driver);
        let registry = PresenceRegistry::new(store.clone(), Duration::from_secs(60));
        registry.heartbeat(
            driver_id,
            CachedPresence {
                socket_id: Some("sock".into()),
                is_online: true,
                is_active: true,
                last_seen: 1,
                location: Location { lng: 0.0, lat: 0.0 },
            },
        );
        registry.disconnect(driver_id);
        let stored = store.get_driver(driver_id).unwrap();
        assert!(!stored.is_online);
        assert!(!stored.is_busy);
        assert!(stored.socket_id.is_none());
    }
}
