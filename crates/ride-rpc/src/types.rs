//! Wire-facing request/result shapes that aren't already a domain type.
//! Every inbound event that carries a literal payload gets one of these;
//! anything that just forwards a domain value (`Ride`, `Location`, ...)
//! reuses `ride_core` directly rather than re-declaring it.

use ride_core::booking::{BookingType, CancelledBy, PaymentMethod};
use ride_core::ride::{FareBreakdown, Location};
use ride_core::{DriverId, Money, Participant, RideId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectAck {
    pub connection_id: String,
}

/// Result of `verifyStartOtp`/`verifyStopOtp`: a pure check — verification
/// alone never mutates ride state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OtpCheckResult {
    pub success: bool,
}

/// Fare/distance are supplied already-resolved (the Maps-oracle quote and
/// the pricing-rule evaluation both happen upstream of this crate); it only
/// ever consumes a finished `FareBreakdown`, never computes one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RequestRideParams {
    pub rider_id: UserId,
    pub pickup: Location,
    pub dropoff: Location,
    pub booking_type: BookingType,
    pub payment_method: PaymentMethod,
    pub distance_km: f64,
    pub fare: Money,
    pub fare_inputs: FareBreakdown,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationUpdateParams {
    pub driver_id: DriverId,
    pub location: Location,
    pub ride_id: Option<RideId>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompleteRideParams {
    pub ride_id: RideId,
    pub otp: String,
    pub fare_override: Option<Money>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CancelRideParams {
    pub ride_id: RideId,
    pub by: CancelledBy,
    pub reason: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SendMessageParams {
    pub ride_id: RideId,
    pub sender: Participant,
    pub body: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitRatingParams {
    pub ride_id: RideId,
    pub rater: Participant,
    pub stars: u8,
    pub comment: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EmergencyAlertParams {
    pub ride_id: RideId,
    pub raised_by: Participant,
    pub location: Location,
    pub reason: String,
}
