//! The Ride entity and its state machine.
//!
//! `Ride::apply` is a pure function: `(Ride, RideAction) -> Result<Ride,
//! RideError>`. It never touches a store or a lock — `ride-store::RideEngine`
//! is the only caller, and only ever commits the result after the relevant
//! lock (dispatch lock, accept lock, per-user lock) has been acquired. No
//! panics, no thrown errors, just a `Result` the caller matches on.

use crate::booking::{BookingType, CancelledBy, PaymentMethod, PaymentStatus};
use crate::error::{codes, RideError};
use crate::ids::{DriverId, RideId, UserId};
use crate::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lng: f64,
    pub lat: f64,
}

/// A 4-digit decimal OTP. Minting (OS-random) lives in `ride-crypto`; this
/// type is just the wire/storage shape so `ride-core` never needs a crypto
/// dependency. Equality is still constant-time: `RideAction::StartRide` and
/// `CompleteRide` compare the caller-supplied digits against this type
/// directly, so a timing side channel must not leak partial matches even on
/// the mutating path, not just the read-only `verifyStartOtp` query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Otp(pub String);

impl Otp {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Otp {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = (self.0.as_bytes(), other.0.as_bytes());
        if a.len() != b.len() {
            return false;
        }
        a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
    }
}

impl Eq for Otp {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RideStatus {
    Requested,
    Accepted,
    Arrived,
    InProgress,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RideStatus::Completed | RideStatus::Cancelled)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

/// The fare inputs the Finalizer recomputes from at ride completion.
/// Fixed at ride creation from the Maps oracle quote + Settings' pricing
/// rule (both out of scope); the Finalizer never changes them, only reads
/// them to derive the authoritative `fare`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base_fare: crate::Money,
    pub distance_fare: crate::Money,
    pub time_fare: crate::Money,
    pub discount: crate::Money,
    pub minimum_fare: crate::Money,
}

impl FareBreakdown {
    /// `max(base + distance + time - discount, minimumFare)`.
    pub fn recompute(&self) -> crate::Money {
        let raw = self.base_fare + self.distance_fare + self.time_fare - self.discount;
        if raw.0 > self.minimum_fare.0 {
            raw
        } else {
            self.minimum_fare
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ride {
    pub id: RideId,
    pub rider_id: UserId,
    pub driver_id: Option<DriverId>,
    pub pickup: Location,
    pub dropoff: Location,
    pub status: RideStatus,
    pub booking_type: BookingType,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub fare: crate::Money,
    pub fare_inputs: FareBreakdown,
    pub distance_km: f64,
    pub start_otp: Otp,
    pub stop_otp: Otp,
    pub driver_arrived_at: Option<Timestamp>,
    pub actual_start_time: Option<Timestamp>,
    pub actual_end_time: Option<Timestamp>,
    pub notified_drivers: Vec<DriverId>,
    pub rejected_drivers: Vec<DriverId>,
    pub cancelled_by: Option<CancelledBy>,
    pub cancellation_reason: Option<String>,
    pub wallet_amount_used: crate::Money,
    pub gateway_amount_paid: crate::Money,
    pub gateway_payment_id: Option<String>,
    pub transaction_id: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Transitions of the ride state graph. `now` is threaded explicitly rather
/// than read from a clock inside `apply`, keeping the function pure and
/// testable with literal timestamps.
#[derive(Clone, Debug)]
pub enum RideAction {
    Accept { driver_id: DriverId, now: Timestamp },
    Arrive { by: DriverId, now: Timestamp },
    StartRide { otp: Otp, now: Timestamp },
    CompleteRide { otp: Otp, fare_override: Option<crate::Money>, now: Timestamp },
    Cancel { by: CancelledBy, reason: String, now: Timestamp },
    Reject { driver_id: DriverId },
}

impl Ride {
    pub fn new(
        id: RideId,
        rider_id: UserId,
        pickup: Location,
        dropoff: Location,
        booking_type: BookingType,
        payment_method: PaymentMethod,
        distance_km: f64,
        fare: crate::Money,
        fare_inputs: FareBreakdown,
        start_otp: Otp,
        stop_otp: Otp,
        now: Timestamp,
    ) -> Self {
        Ride {
            id,
            rider_id,
            driver_id: None,
            pickup,
            dropoff,
            status: RideStatus::Requested,
            booking_type,
            payment_method,
            payment_status: PaymentStatus::Pending,
            fare,
            fare_inputs,
            distance_km,
            start_otp,
            stop_otp,
            driver_arrived_at: None,
            actual_start_time: None,
            actual_end_time: None,
            notified_drivers: Vec::new(),
            rejected_drivers: Vec::new(),
            cancelled_by: None,
            cancellation_reason: None,
            wallet_amount_used: crate::Money::ZERO,
            gateway_amount_paid: crate::Money::ZERO,
            gateway_payment_id: None,
            transaction_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validates and applies one transition. Terminal rides reject every
    /// action (I3: once `completed`, all fields immutable except
    /// `paymentStatus`, which admin flows mutate out-of-band, not via
    /// `apply`).
    pub fn apply(mut self, action: RideAction) -> Result<Self, RideError> {
        match action {
            RideAction::Accept { driver_id, now } => {
                if self.status != RideStatus::Requested {
                    return Err(RideError::concurrency(
                        codes::RIDE_ALREADY_ACCEPTED,
                        "ride is no longer requested",
                        self.id,
                    ));
                }
                self.status = RideStatus::Accepted;
                self.driver_id = Some(driver_id);
                self.updated_at = now;
                Ok(self)
            }
            RideAction::Arrive { by, now } => {
                self.require_assigned_driver(by)?;
                if self.status != RideStatus::Accepted {
                    return Err(RideError::business(
                        codes::RIDE_ACCEPTANCE_FAILED,
                        "ride is not in accepted state",
                    ));
                }
                self.status = RideStatus::Arrived;
                self.driver_arrived_at = Some(now);
                self.updated_at = now;
                Ok(self)
            }
            RideAction::StartRide { otp, now } => {
                if self.status != RideStatus::Arrived {
                    return Err(RideError::business(
                        codes::RIDE_ACCEPTANCE_FAILED,
                        "ride is not in arrived state",
                    ));
                }
                if otp != self.start_otp {
                    return Err(RideError::validation("OTP_MISMATCH", "start otp did not match"));
                }
                self.status = RideStatus::InProgress;
                self.actual_start_time = Some(now);
                self.updated_at = now;
                Ok(self)
            }
            RideAction::CompleteRide { otp, fare_override, now } => {
                if self.status != RideStatus::InProgress {
                    return Err(RideError::business(
                        codes::RIDE_ACCEPTANCE_FAILED,
                        "ride is not in progress",
                    ));
                }
                if otp != self.stop_otp {
                    return Err(RideError::validation("OTP_MISMATCH", "stop otp did not match"));
                }
                if let Some(fare) = fare_override {
                    self.fare = fare;
                }
                self.status = RideStatus::Completed;
                self.actual_end_time = Some(now);
                self.updated_at = now;
                Ok(self)
            }
            RideAction::Cancel { by, reason, now } => {
                if self.status.is_terminal() {
                    // cancel(r) ∘ cancel(r) is a no-op on second call.
                    return Ok(self);
                }
                self.status = RideStatus::Cancelled;
                self.cancelled_by = Some(by);
                self.cancellation_reason = Some(reason);
                self.updated_at = now;
                Ok(self)
            }
            RideAction::Reject { driver_id } => {
                if !self.rejected_drivers.contains(&driver_id) {
                    self.rejected_drivers.push(driver_id);
                }
                Ok(self)
            }
        }
    }

    fn require_assigned_driver(&self, caller: DriverId) -> Result<(), RideError> {
        match self.driver_id {
            Some(id) if id == caller => Ok(()),
            _ => Err(RideError::validation(
                "NOT_ASSIGNED_DRIVER",
                "caller is not the assigned driver for this ride",
            )),
        }
    }

    /// OTPs are held by the rider and spoken verbally; a driver-facing
    /// payload must never carry either digit string, verified or not.
    /// Every site that emits a `Ride` into a driver room or driver socket
    /// must route it through this first.
    pub fn redact_otps_for_driver(mut self) -> Self {
        self.start_otp = Otp(String::new());
        self.stop_otp = Otp(String::new());
        self
    }

    /// D1/I2: a driver id must be present once status is in the "has a
    /// driver" set.
    pub fn invariant_driver_present(&self) -> bool {
        match self.status {
            RideStatus::Accepted | RideStatus::Arrived | RideStatus::InProgress | RideStatus::Completed => {
                self.driver_id.is_some()
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::PaymentMethod;

    fn sample_fare_inputs() -> FareBreakdown {
        FareBreakdown {
            base_fare: crate::Money::from_major(50.0),
            distance_fare: crate::Money::from_major(40.0),
            time_fare: crate::Money::from_major(10.0),
            discount: crate::Money::ZERO,
            minimum_fare: crate::Money::from_major(60.0),
        }
    }

    fn sample_ride() -> Ride {
        Ride::new(
            RideId::new(),
            UserId::new(),
            Location { lng: 0.0, lat: 0.0 },
            Location { lng: 1.0, lat: 1.0 },
            BookingType::Instant,
            PaymentMethod::Wallet,
            5.0,
            crate::Money::from_major(100.0),
            sample_fare_inputs(),
            Otp("0471".into()),
            Otp("9126".into()),
            1000,
        )
    }

    #[test]
    fn accept_sets_driver_and_status() {
        let ride = sample_ride();
        let driver_id = DriverId::new();
        let ride = ride.apply(RideAction::Accept { driver_id, now: 1001 }).unwrap();
        assert_eq!(ride.status, RideStatus::Accepted);
        assert_eq!(ride.driver_id, Some(driver_id));
        assert!(ride.invariant_driver_present());
    }

    #[test]
    fn double_accept_is_rejected() {
        let ride = sample_ride();
        let driver_id = DriverId::new();
        let ride = ride.apply(RideAction::Accept { driver_id, now: 1001 }).unwrap();
        let other = DriverId::new();
        let err = ride.apply(RideAction::Accept { driver_id: other, now: 1002 }).unwrap_err();
        assert_eq!(err.wire_code(), Some(codes::RIDE_ALREADY_ACCEPTED));
    }

    #[test]
    fn otp_mismatch_leaves_state_unchanged_and_is_rejected() {
        let driver_id = DriverId::new();
        let ride = sample_ride()
            .apply(RideAction::Accept { driver_id, now: 1001 })
            .unwrap()
            .apply(RideAction::Arrive { by: driver_id, now: 1002 })
            .unwrap();
        let status_before = ride.status;
        let err = ride
            .clone()
            .apply(RideAction::StartRide { otp: Otp("0000".into()), now: 1003 })
            .unwrap_err();
        assert!(matches!(err, RideError::Validation { .. }));
        assert_eq!(ride.status, status_before);
    }

    #[test]
    fn cancel_is_idempotent() {
        let ride = sample_ride();
        let once = ride
            .apply(RideAction::Cancel { by: CancelledBy::Rider, reason: "changed mind".into(), now: 1001 })
            .unwrap();
        let twice = once
            .clone()
            .apply(RideAction::Cancel { by: CancelledBy::System, reason: "ignored".into(), now: 1002 })
            .unwrap();
        assert_eq!(once.status, RideStatus::Cancelled);
        assert_eq!(twice.cancellation_reason, once.cancellation_reason);
        assert_eq!(twice.updated_at, once.updated_at);
    }

    #[test]
    fn cancel_from_terminal_completed_is_noop() {
        let driver_id = DriverId::new();
        let ride = sample_ride()
            .apply(RideAction::Accept { driver_id, now: 1 })
            .unwrap()
            .apply(RideAction::Arrive { by: driver_id, now: 2 })
            .unwrap()
            .apply(RideAction::StartRide { otp: Otp("0471".into()), now: 3 })
            .unwrap()
            .apply(RideAction::CompleteRide { otp: Otp("9126".into()), fare_override: None, now: 4 })
            .unwrap();
        let after_cancel = ride
            .clone()
            .apply(RideAction::Cancel { by: CancelledBy::Rider, reason: "too late".into(), now: 5 })
            .unwrap();
        assert_eq!(after_cancel.status, RideStatus::Completed);
    }
}
