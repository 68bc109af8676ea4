//! The pure candidate-eligibility and ordering layer (`spec.md` §4.1 step 3).
//! No store coupling — callers (`ride-dispatch`) hand in a snapshot of
//! driver presence and get back an ordered candidate list. This mirrors the
//! teacher's `matching::MatchingAlgorithm` trait shape, generalized from H3
//! cell distance to haversine and from a single best-match to an ordered
//! batch (the Dispatch Pipeline notifies every candidate in order, not just
//! the winner).

use crate::haversine::distance_km;
use ride_core::{BookingType, DriverId, Location, Timestamp};
use std::collections::HashSet;

/// A snapshot of one driver's dispatch-relevant state, assembled by the
/// caller from `ride-presence` (cache-first) and `ride-store` (fallback).
#[derive(Clone, Debug)]
pub struct CandidateInput {
    pub driver_id: DriverId,
    pub location: Location,
    pub is_online: bool,
    pub is_active: bool,
    pub is_busy: bool,
    pub has_socket: bool,
    pub rating: f64,
    pub last_seen: Timestamp,
}

impl CandidateInput {
    fn base_eligible(&self) -> bool {
        self.is_online && self.is_active && !self.is_busy && self.has_socket
    }
}

/// Whether a driver may serve a given booking type at all. The distilled
/// spec names this guard ("bookingType-eligible") without further detail;
/// every driver is currently eligible for every booking type, but the hook
/// exists so a future vehicle-class restriction has a single call site.
pub fn booking_type_eligible(_booking_type: &BookingType, _candidate: &CandidateInput) -> bool {
    true
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScoredCandidate {
    pub driver_id: DriverId,
    pub distance_km: f64,
}

/// Returns drivers within `radius_km` of `pickup` that are online, active,
/// not busy, have a socket, and are not in `rejected`, ordered by ascending
/// distance, ties broken by descending rating then earliest `last_seen`, and
/// truncated to `max_candidates`.
pub fn select_candidates(
    pickup: Location,
    radius_km: f64,
    booking_type: &BookingType,
    candidates: &[CandidateInput],
    rejected: &HashSet<DriverId>,
    max_candidates: usize,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<(ScoredCandidate, f64, Timestamp)> = candidates
        .iter()
        .filter(|c| c.base_eligible())
        .filter(|c| !rejected.contains(&c.driver_id))
        .filter(|c| booking_type_eligible(booking_type, c))
        .filter_map(|c| {
            let d = distance_km(pickup, c.location);
            if d <= radius_km {
                Some((ScoredCandidate { driver_id: c.driver_id, distance_km: d }, c.rating, c.last_seen))
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|(a, a_rating, a_seen), (b, b_rating, b_seen)| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap()
            .then_with(|| b_rating.partial_cmp(a_rating).unwrap())
            .then_with(|| a_seen.cmp(b_seen))
    });

    scored.truncate(max_candidates);
    scored.into_iter().map(|(c, _, _)| c).collect()
}

/// Runs `select_candidates` over a progressive radius schedule, returning
/// the first non-empty result and the radius at which it was found
/// (`spec.md` §8: "with candidates only at exactly R_k km, the Matcher
/// returns them at stage k, not k-1").
pub fn progressive_search(
    pickup: Location,
    radii_km: &[f64],
    booking_type: &BookingType,
    candidates: &[CandidateInput],
    rejected: &HashSet<DriverId>,
    max_candidates: usize,
) -> Option<(Vec<ScoredCandidate>, f64)> {
    for &radius in radii_km {
        let found = select_candidates(pickup, radius, booking_type, candidates, rejected, max_candidates);
        if !found.is_empty() {
            return Some((found, radius));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use ride_core::DriverId;

    fn candidate(id: DriverId, lng: f64, lat: f64, rating: f64, last_seen: Timestamp) -> CandidateInput {
        CandidateInput {
            driver_id: id,
            location: Location { lng, lat },
            is_online: true,
            is_active: true,
            is_busy: false,
            has_socket: true,
            rating,
            last_seen,
        }
    }

    #[test]
    fn orders_by_distance_then_rating_then_last_seen() {
        let pickup = Location { lng: 0.0, lat: 0.0 };
        let near_low_rating = candidate(DriverId::new(), 0.001, 0.0, 3.0, 100);
        let near_high_rating = candidate(DriverId::new(), 0.001, 0.0, 4.8, 50);
        let far = candidate(DriverId::new(), 0.05, 0.0, 5.0, 10);
        let drivers = vec![far.clone(), near_low_rating.clone(), near_high_rating.clone()];
        let result = select_candidates(
            pickup,
            10.0,
            &BookingType::Instant,
            &drivers,
            &HashSet::new(),
            20,
        );
        assert_eq!(result[0].driver_id, near_high_rating.driver_id);
        assert_eq!(result[1].driver_id, near_low_rating.driver_id);
        assert_eq!(result[2].driver_id, far.driver_id);
    }

    #[test]
    fn excludes_busy_offline_and_rejected_drivers() {
        let pickup = Location { lng: 0.0, lat: 0.0 };
        let mut busy = candidate(DriverId::new(), 0.001, 0.0, 5.0, 1);
        busy.is_busy = true;
        let mut offline = candidate(DriverId::new(), 0.001, 0.0, 5.0, 1);
        offline.is_online = false;
        let rejected_driver = candidate(DriverId::new(), 0.001, 0.0, 5.0, 1);
        let eligible = candidate(DriverId::new(), 0.001, 0.0, 5.0, 1);

        let mut rejected = HashSet::new();
        rejected.insert(rejected_driver.driver_id);

        let drivers = vec![busy, offline, rejected_driver, eligible.clone()];
        let result = select_candidates(pickup, 10.0, &BookingType::Instant, &drivers, &rejected, 20);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].driver_id, eligible.driver_id);
    }

    #[test]
    fn progressive_search_returns_candidates_at_exact_boundary_radius() {
        let pickup = Location { lng: 0.0, lat: 0.0 };
        // ~9km north.
        let driver = candidate(DriverId::new(), 0.0, 0.081, 5.0, 1);
        let drivers = vec![driver.clone()];
        let radii = [3.0, 6.0, 9.0, 12.0];
        let (found, radius_used) =
            progressive_search(pickup, &radii, &BookingType::Instant, &drivers, &HashSet::new(), 20).unwrap();
        assert_eq!(radius_used, 9.0);
        assert_eq!(found[0].driver_id, driver.driver_id);
    }

    #[test]
    fn progressive_search_returns_none_when_nobody_in_any_radius() {
        let pickup = Location { lng: 0.0, lat: 0.0 };
        let far = candidate(DriverId::new(), 10.0, 10.0, 5.0, 1);
        let radii = [3.0, 6.0];
        assert!(progressive_search(pickup, &radii, &BookingType::Instant, &[far], &HashSet::new(), 20).is_none());
    }
}
