//! Wire event payloads (`spec.md` §6). Every inbound event is exposed as a
//! `jsonrpsee` RPC method in `ride-rpc`; every outbound event is a variant of
//! [`OutboundEvent`] here, serialized identically whether it travels as an
//! RPC response or is pushed asynchronously through `ride-events::Bus`.

use crate::booking::CancelledBy;
use crate::ids::{DriverId, Participant, RideId, UserId};
use crate::ride::{Location, Ride};
use crate::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    RideRequested { ride: Ride },
    RideAccepted { ride: Ride },
    #[serde(rename_all = "camelCase")]
    DriverLocationUpdate { driver_id: DriverId, location: Location },
    #[serde(rename_all = "camelCase")]
    DriverArrived { ride_id: RideId },
    #[serde(rename_all = "camelCase")]
    RideStarted { ride_id: RideId },
    #[serde(rename_all = "camelCase")]
    RideLocationUpdate { ride_id: RideId, location: Location },
    RideCompleted { ride: Ride },
    #[serde(rename_all = "camelCase")]
    RideCancelled { ride_id: RideId, cancelled_by: CancelledBy, reason: String },
    #[serde(rename_all = "camelCase")]
    NoDriverFound { ride_id: RideId, reason: String },
    #[serde(rename_all = "camelCase")]
    RideError { code: &'static str, message: String, ride_id: Option<RideId> },

    NewRideRequest { ride: Ride },
    RideAssigned { ride: Ride },
    #[serde(rename_all = "camelCase")]
    RideNoLongerAvailable { ride_id: RideId },
    OtpVerified { success: bool, ride: Ride },
    OtpVerificationFailed { message: String },
    #[serde(rename_all = "camelCase")]
    DriverStatusUpdate { driver_id: DriverId, is_active: bool },
    #[serde(rename_all = "camelCase")]
    DriverEarningAdded { driver_id: DriverId, ride_id: RideId, amount: crate::Money },

    /// Ride-scoped chat/rating/safety events. No dedicated store backs
    /// these (§9 Non-goals excludes a messaging/rating CRUD surface) — they
    /// are authorized, broadcast, and otherwise stateless.
    #[serde(rename_all = "camelCase")]
    ReceiveMessage { ride_id: RideId, sender: Participant, body: String, sent_at: Timestamp },
    #[serde(rename_all = "camelCase")]
    UnreadCountUpdated { user_id: UserId, count: u32 },
    #[serde(rename_all = "camelCase")]
    RatingReceived { ride_id: RideId, stars: u8, comment: Option<String> },
    #[serde(rename_all = "camelCase")]
    EmergencyAlert { ride_id: RideId, raised_by: Participant, location: Location, reason: String },
}

/// `spec.md` §6 room naming. A single source of truth so `ride-events`,
/// `ride-dispatch`, and `ride-arbiter` never hand-format a room string.
pub mod rooms {
    use super::*;

    pub fn user(id: UserId) -> String {
        format!("user_{id}")
    }

    pub fn driver(id: DriverId) -> String {
        format!("driver_{id}")
    }

    pub fn ride(id: RideId) -> String {
        format!("ride_{id}")
    }

    pub const ADMIN: &str = "admin";
    pub const ADMIN_SUPPORT_ONLINE: &str = "admin_support_online";
}
