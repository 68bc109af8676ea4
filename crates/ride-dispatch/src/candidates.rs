//! Assembles the `ride-geo::CandidateInput` snapshot the Matcher needs from
//! presence (cache-first) and the driver store (fallback), running the
//! validation-and-repair pass on each driver before it's considered
//! (`spec.md` §4.6: "symmetric repair applied before each dispatch
//! decision").

use ride_core::DriverId;
use ride_geo::CandidateInput;
use ride_presence::PresenceRegistry;
use ride_store::RideStore;
use std::sync::Arc;

pub fn gather_candidates(store: &Arc<dyn RideStore>, presence: &PresenceRegistry) -> Vec<CandidateInput> {
    store
        .all_drivers()
        .into_iter()
        .filter_map(|driver| {
            let driver_id = driver.id;
            let mut driver = driver;
            presence.repair_busy_flag(&mut driver);
            store.put_driver(driver.clone());

            let cached = presence.lookup(driver_id);
            let (socket_id, is_online, is_active, last_seen, location) = match cached {
                Some(p) => (p.socket_id, p.is_online, p.is_active, p.last_seen, p.location),
                None => (driver.socket_id.clone(), driver.is_online, driver.is_active, driver.last_seen, driver.location),
            };

            Some(CandidateInput {
                driver_id,
                location,
                is_online,
                is_active,
                is_busy: driver.is_busy,
                has_socket: socket_id.is_some(),
                rating: driver.rating,
                last_seen,
            })
        })
        .collect()
}

pub fn exclude(driver_ids: &[DriverId]) -> std::collections::HashSet<DriverId> {
    driver_ids.iter().copied().collect()
}
