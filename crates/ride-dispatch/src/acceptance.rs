//! Acceptance arbitration (`spec.md` §4.3): the single-winner lock, the
//! post-win transactional re-verify, and the notification fan-out to the
//! rider, the winning driver, and every losing notified driver. Lives in
//! `ride-dispatch` rather than `ride-arbiter` itself because `ride-arbiter`
//! is deliberately just the lock primitive (mirrors the teacher's split
//! between a lock/lease primitive crate and the worker that uses it);
//! everything that *reacts* to winning or losing the lock belongs with the
//! rest of the dispatch orchestration.

use crate::pipeline::DispatchPipeline;
use ride_core::error::codes;
use ride_core::events::rooms;
use ride_core::ride::RideAction;
use ride_core::{DriverId, OutboundEvent, RideError, RideId};
use tracing::info;

impl DispatchPipeline {
    /// Handles an inbound `rideAccepted(rideId, driverId)` from a driver.
    /// §4.3 steps 1-5. Returns the wire-facing error the caller should
    /// return to the losing/erroring driver; `Ok(())` means the driver won
    /// and the winner-side notifications have already been emitted.
    pub fn handle_acceptance(&self, ride_id: RideId, driver_id: DriverId) -> Result<(), RideError> {
        let Some(guard) = self.arbiter().try_win_acceptance(ride_id, driver_id) else {
            return Err(RideError::concurrency(
                codes::RIDE_ALREADY_ACCEPTED,
                "another driver already holds the acceptance lock for this ride",
                ride_id,
            ));
        };

        let transitioned = self.engine().transition(
            ride_id,
            RideAction::Accept { driver_id, now: ride_core::now() },
        );

        let ride = match transitioned {
            Ok(ride) => ride,
            Err(err) => {
                // §4.3 step 3: re-verify failed (ride was cancelled or
                // already accepted through some other path) — release the
                // lock so it doesn't linger for its full TTL.
                self.arbiter().release_acceptance(guard);
                return Err(err);
            }
        };

        info!(%ride_id, %driver_id, "driver won ride acceptance");

        self.bus().emit_to_room(&rooms::user(ride.rider_id), OutboundEvent::RideAccepted { ride: ride.clone() });
        self.bus().emit_to_room(
            &rooms::driver(driver_id),
            OutboundEvent::RideAssigned { ride: ride.clone().redact_otps_for_driver() },
        );

        self.notify_losers(&ride, driver_id);
        self.force_join_ride_room(&ride, driver_id);

        // The lock has done its job (Driver.is_busy now reflects the win via
        // the engine's D1 reconciliation); let it expire by TTL rather than
        // releasing it early, so a racing loser that hasn't yet observed the
        // new status can't somehow re-acquire and "win" a second time within
        // the same window.
        let _ = guard;

        Ok(())
    }

    fn notify_losers(&self, ride: &ride_core::ride::Ride, winner: DriverId) {
        for &loser in ride.notified_drivers.iter().filter(|&&d| d != winner) {
            self.bus().emit_to_room(&rooms::driver(loser), OutboundEvent::RideNoLongerAvailable { ride_id: ride.id });
            if let Some(driver) = self.engine().store().get_driver(loser) {
                if let Some(socket_id) = driver.socket_id {
                    self.bus().emit_direct(&socket_id, OutboundEvent::RideNoLongerAvailable { ride_id: ride.id });
                }
            }
        }
    }

    /// §4.3 step 5: force-join the winner and the rider into `ride_{rideId}`
    /// server-side, since clients may not yet have subscribed to the room.
    fn force_join_ride_room(&self, ride: &ride_core::ride::Ride, driver_id: DriverId) {
        let mut connections = Vec::new();
        if let Some(driver) = self.engine().store().get_driver(driver_id) {
            if let Some(socket_id) = driver.socket_id {
                if let Some(conn) = self.bus().connection_for_socket(&socket_id) {
                    connections.push(conn);
                }
            }
        }
        if let Some(rider) = self.engine().store().get_user(ride.rider_id) {
            if let Some(socket_id) = rider.socket_id {
                if let Some(conn) = self.bus().connection_for_socket(&socket_id) {
                    connections.push(conn);
                }
            }
        }
        if !connections.is_empty() {
            self.bus().force_join_ride_room(ride.id, &connections);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use ride_arbiter::Arbiter;
    use ride_core::booking::{BookingType, PaymentMethod};
    use ride_core::{Driver, Location, Money, Otp, RideStatus, User, UserId, VehicleInfo};
    use ride_events::{Bus, ConnectionIdentity};
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

    fn sample_driver(id: DriverId) -> Driver {
        let mut d = Driver::new(
            id,
            Location { lng: 0.0, lat: 0.0 },
            VehicleInfo { make: "Toyota".into(), model: "Prius".into(), plate: "X1".into() },
            1000,
        );
        d.is_online = true;
        d.is_active = true;
        d.socket_id = Some(format!("sock-{id}"));
        d
    }

    fn setup() -> (Arc<DispatchPipeline>, Arc<dyn RideStore>, RideId, DriverId, DriverId) {
        let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
        let locks = Arc::new(InMemoryLockStore::new());
        let engine = Arc::new(RideEngine::new(store.clone(), locks.clone()));
        let presence = Arc::new(PresenceRegistry::new(store.clone(), Duration::from_secs(60)));
        let arbiter = Arc::new(Arbiter::new(locks));
        let bus = Arc::new(Bus::new(store.clone()));

        let rider = UserId::new();
        store.put_user(User::new(rider));

        let driver_a = DriverId::new();
        let driver_b = DriverId::new();
        store.put_driver(sample_driver(driver_a));
        store.put_driver(sample_driver(driver_b));

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

        let config = DispatchConfig::default();
        let pipeline = DispatchPipeline::spawn(engine, presence, arbiter, bus, config);
        (pipeline, store, ride.id, driver_a, driver_b)
    }

    #[tokio::test]
    async fn first_acceptor_wins_and_second_is_rejected() {
        let (pipeline, store, ride_id, driver_a, driver_b) = setup();

        pipeline.handle_acceptance(ride_id, driver_a).unwrap();
        let err = pipeline.handle_acceptance(ride_id, driver_b).unwrap_err();

        assert_eq!(err.wire_code(), Some(codes::RIDE_ALREADY_ACCEPTED));
        let ride = store.get_ride(ride_id).unwrap();
        assert_eq!(ride.status, RideStatus::Accepted);
        assert_eq!(ride.driver_id, Some(driver_a));
        assert!(store.get_driver(driver_a).unwrap().is_busy);
    }

    #[tokio::test]
    async fn winner_and_rider_are_force_joined_into_ride_room() {
        let (pipeline, store, ride_id, driver_a, _driver_b) = setup();
        let ride = store.get_ride(ride_id).unwrap();

        let (rider_conn, mut rider_rx) =
            pipeline.bus().register(ConnectionIdentity::Rider(ride.rider_id), "rider-sock".into());
        let mut rider = store.get_user(ride.rider_id).unwrap();
        rider.socket_id = Some("rider-sock".into());
        store.put_user(rider);

        let (driver_conn, mut driver_rx) =
            pipeline.bus().register(ConnectionIdentity::Driver(driver_a), format!("sock-{driver_a}"));

        pipeline.handle_acceptance(ride_id, driver_a).unwrap();

        // Both should have received their respective notifications directly
        // (room membership) even before force-join runs.
        assert!(rider_rx.try_recv().is_ok());
        assert!(driver_rx.try_recv().is_ok());

        pipeline.bus().emit_to_room(&rooms::ride(ride_id), OutboundEvent::RideStarted { ride_id });
        assert!(rider_rx.try_recv().is_ok());
        assert!(driver_rx.try_recv().is_ok());
        let _ = (rider_conn, driver_conn);
    }

    #[tokio::test]
    async fn losers_receive_ride_no_longer_available() {
        let (pipeline, store, ride_id, driver_a, driver_b) = setup();
        let (_conn, mut loser_rx) =
            pipeline.bus().register(ConnectionIdentity::Driver(driver_b), format!("sock-{driver_b}"));

        pipeline.handle_acceptance(ride_id, driver_a).unwrap();

        let mut saw_no_longer_available = false;
        while let Ok(event) = loser_rx.try_recv() {
            if matches!(event, OutboundEvent::RideNoLongerAvailable { ride_id: r } if r == ride_id) {
                saw_no_longer_available = true;
            }
        }
        assert!(saw_no_longer_available);
        let _ = store;
    }
}
