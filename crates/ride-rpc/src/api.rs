//! The JSON-RPC surface. One method per inbound wire event; names follow
//! the camelCase wire catalogue rather than Rust's snake_case convention,
//! matching how `chronx-rpc` exposes its namespace methods.

use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use ride_core::ride::Ride;
use ride_core::{DriverId, Participant, RideId, UserId};

use crate::types::*;

#[rpc(server, client, namespace = "ride")]
pub trait RideApi {
    #[method(name = "riderConnect")]
    async fn rider_connect(&self, user_id: UserId, socket_id: String) -> RpcResult<()>;

    #[method(name = "riderDisconnect")]
    async fn rider_disconnect(&self, user_id: UserId) -> RpcResult<()>;

    #[method(name = "driverConnect")]
    async fn driver_connect(&self, driver_id: DriverId, socket_id: String) -> RpcResult<()>;

    #[method(name = "driverDisconnect")]
    async fn driver_disconnect(&self, driver_id: DriverId) -> RpcResult<()>;

    #[method(name = "driverToggleStatus")]
    async fn driver_toggle_status(&self, driver_id: DriverId, is_active: bool) -> RpcResult<()>;

    #[method(name = "driverLocationUpdate")]
    async fn driver_location_update(&self, params: LocationUpdateParams) -> RpcResult<()>;

    #[method(name = "newRideRequest")]
    async fn request_ride(&self, params: RequestRideParams) -> RpcResult<Ride>;

    #[method(name = "rideAccepted")]
    async fn ride_accept(&self, ride_id: RideId, driver_id: DriverId) -> RpcResult<Ride>;

    #[method(name = "rideRejected")]
    async fn ride_reject(&self, ride_id: RideId, driver_id: DriverId) -> RpcResult<()>;

    #[method(name = "driverArrived")]
    async fn driver_arrive(&self, ride_id: RideId, driver_id: DriverId) -> RpcResult<()>;

    #[method(name = "verifyStartOtp")]
    async fn verify_start_otp(&self, ride_id: RideId, otp: String) -> RpcResult<OtpCheckResult>;

    #[method(name = "rideStarted")]
    async fn ride_started(&self, ride_id: RideId, otp: String) -> RpcResult<Ride>;

    #[method(name = "verifyStopOtp")]
    async fn verify_stop_otp(&self, ride_id: RideId, otp: String) -> RpcResult<OtpCheckResult>;

    #[method(name = "rideCompleted")]
    async fn ride_completed(&self, params: CompleteRideParams) -> RpcResult<Ride>;

    #[method(name = "rideCancelled")]
    async fn cancel_ride(&self, params: CancelRideParams) -> RpcResult<()>;

    #[method(name = "joinRideRoom")]
    async fn join_ride_room(&self, caller: Participant, ride_id: RideId, socket_id: String) -> RpcResult<()>;

    #[method(name = "leaveRideRoom")]
    async fn leave_ride_room(&self, ride_id: RideId, socket_id: String) -> RpcResult<()>;

    #[method(name = "sendMessage")]
    async fn send_message(&self, params: SendMessageParams) -> RpcResult<()>;

    #[method(name = "markMessageRead")]
    async fn mark_message_read(&self, user_id: UserId) -> RpcResult<()>;

    #[method(name = "getRideMessages")]
    async fn get_ride_messages(&self, ride_id: RideId) -> RpcResult<Vec<()>>;

    #[method(name = "submitRating")]
    async fn submit_rating(&self, params: SubmitRatingParams) -> RpcResult<()>;

    #[method(name = "emergencyAlert")]
    async fn emergency_alert(&self, params: EmergencyAlertParams) -> RpcResult<()>;
}
