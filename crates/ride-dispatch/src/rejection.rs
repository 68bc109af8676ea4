//! The rejection cascade (`spec.md` §4.4): a driver declining a
//! `newRideRequest` never fails the ride outright. It's folded into
//! `rejectedDrivers`, and only once every notified driver has responded
//! (or rejected) does the pipeline retry the Matcher over the wider
//! `retry_radii_km` schedule before giving up.

use crate::candidates::{exclude, gather_candidates};
use crate::pipeline::DispatchPipeline;
use ride_core::ride::RideAction;
use ride_core::{DriverId, RideId, RideStatus};
use ride_geo::progressive_search;
use tracing::info;

impl DispatchPipeline {
    /// Handles an inbound `rideRejected` for `driver_id`. Always clears the
    /// rejecting driver's stale `is_busy` flag (it was never the assigned
    /// driver, but a crashed client can leave the flag set from an earlier
    /// session) regardless of whether the cascade trigger fires.
    pub fn handle_rejection(&self, ride_id: RideId, driver_id: DriverId) -> Result<(), ride_core::RideError> {
        self.presence().repair_and_persist(driver_id);

        let ride = self.engine().transition(ride_id, RideAction::Reject { driver_id })?;
        if ride.status != RideStatus::Requested {
            return Ok(());
        }

        if ride.rejected_drivers.len() < ride.notified_drivers.len() {
            // Still waiting on other notified drivers to respond.
            return Ok(());
        }

        info!(%ride_id, rejected = ride.rejected_drivers.len(), "all notified drivers rejected, retrying wider search");
        self.retry_wider_search(ride_id)
    }

    fn retry_wider_search(&self, ride_id: RideId) -> Result<(), ride_core::RideError> {
        let Some(ride) = self.engine().store().get_ride(ride_id) else { return Ok(()) };
        if ride.status != RideStatus::Requested {
            return Ok(());
        }

        let candidates = gather_candidates(self.engine().store(), self.presence());
        let rejected = exclude(&ride.rejected_drivers);
        let found = progressive_search(
            ride.pickup,
            &self.config().retry_radii_km,
            &ride.booking_type,
            &candidates,
            &rejected,
            self.config().max_candidates,
        );

        match found {
            None => self.cancel_no_driver(ride_id, "All drivers rejected or unavailable"),
            Some((scored, _radius_used)) => {
                self.notify_candidates(ride_id, scored.into_iter().map(|c| c.driver_id).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use ride_arbiter::Arbiter;
    use ride_core::booking::{BookingType, PaymentMethod};
    use ride_core::{Driver, Location, Money, Otp, UserId, VehicleInfo};
    use ride_events::Bus;
    use ride_presence::PresenceRegistry;
    use ride_store::{InMemoryLockStore, MemRideStore, RideEngine, RideStore};
    use std::sync::Arc;
    use std::time::Duration;

    fn sample_fare_inputs() -> ride_core::ride::FareBreakdown {
        ride_core::ride::FareBreakdown {
            base_fare: Money::from_major(50.0),
            distance_fare: Money::from_major(40.0),
            time_fare: Money::from_major(10.0),
            discount: Money::ZERO,
            minimum_fare: Money::from_major(60.0),
        }
    }

    fn sample_driver(id: DriverId, lng: f64, lat: f64) -> Driver {
        let mut d = Driver::new(
            id,
            Location { lng, lat },
            VehicleInfo { make: "Toyota".into(), model: "Prius".into(), plate: "X1".into() },
            1000,
        );
        d.is_online = true;
        d.is_active = true;
        d.socket_id = Some(format!("sock-{id}"));
        d.rating = 4.5;
        d.last_seen = 1000;
        d
    }

    fn setup() -> (Arc<DispatchPipeline>, Arc<dyn RideStore>, RideId, DriverId, DriverId) {
        let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
        let locks = Arc::new(InMemoryLockStore::new());
        let engine = Arc::new(RideEngine::new(store.clone(), locks.clone()));
        let presence = Arc::new(PresenceRegistry::new(store.clone(), Duration::from_secs(60)));
        let arbiter = Arc::new(Arbiter::new(locks));
        let bus = Arc::new(Bus::new(store.clone()));

        let driver_a = DriverId::new();
        let driver_b = DriverId::new();
        store.put_driver(sample_driver(driver_a, 0.001, 0.001));
        store.put_driver(sample_driver(driver_b, 0.002, 0.002));

        let rider = UserId::new();
        let ride = ride_core::ride::Ride::new(
            RideId::new(),
            rider,
            Location { lng: 0.0, lat: 0.0 },
            Location { lng: 1.0, lat: 1.0 },
            BookingType::Instant,
            PaymentMethod::Wallet,
            5.0,
            Money::from_major(100.0),
            sample_fare_inputs(),
            Otp("0471".into()),
            Otp("9126".into()),
            1000,
        );
        let mut ride = engine.begin_ride(ride).unwrap();
        ride.notified_drivers = vec![driver_a, driver_b];
        store.put_ride(ride.clone());

        let config = DispatchConfig { radii_km: vec![3.0], retry_radii_km: vec![50.0], ..DispatchConfig::default() };
        let pipeline = DispatchPipeline::spawn(engine, presence, arbiter, bus, config);
        (pipeline, store, ride.id, driver_a, driver_b)
    }

    #[tokio::test]
    async fn rejection_below_threshold_does_not_trigger_retry() {
        let (pipeline, store, ride_id, driver_a, _driver_b) = setup();
        pipeline.handle_rejection(ride_id, driver_a).unwrap();
        let ride = store.get_ride(ride_id).unwrap();
        assert_eq!(ride.status, RideStatus::Requested);
        assert_eq!(ride.rejected_drivers, vec![driver_a]);
    }

    #[tokio::test]
    async fn all_notified_rejecting_cancels_when_retry_radius_finds_nobody() {
        let (pipeline, store, ride_id, driver_a, driver_b) = setup();
        // Remove both drivers from the store so the retry search finds nothing.
        store.put_driver({
            let mut d = store.get_driver(driver_a).unwrap();
            d.is_online = false;
            d
        });
        store.put_driver({
            let mut d = store.get_driver(driver_b).unwrap();
            d.is_online = false;
            d
        });

        pipeline.handle_rejection(ride_id, driver_a).unwrap();
        pipeline.handle_rejection(ride_id, driver_b).unwrap();

        let ride = store.get_ride(ride_id).unwrap();
        assert_eq!(ride.status, RideStatus::Cancelled);
    }

    #[tokio::test]
    async fn all_notified_rejecting_retries_and_notifies_new_candidate() {
        let (pipeline, store, ride_id, driver_a, driver_b) = setup();
        let driver_c = DriverId::new();
        store.put_driver(sample_driver(driver_c, 0.2, 0.2));

        pipeline.handle_rejection(ride_id, driver_a).unwrap();
        pipeline.handle_rejection(ride_id, driver_b).unwrap();

        let ride = store.get_ride(ride_id).unwrap();
        assert_eq!(ride.status, RideStatus::Requested);
        assert!(ride.notified_drivers.contains(&driver_c));
    }
}
