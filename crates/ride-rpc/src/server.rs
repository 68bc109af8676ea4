//! The jsonrpsee server adapter. `RideRpcServer` holds nothing but a
//! `RideService` and translates every trait method into a call against it,
//! mapping errors with `to_rpc_error`.

use std::net::SocketAddr;

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::server::{Server, ServerHandle};
use ride_core::ride::Ride;
use ride_core::{DriverId, Participant, RideId, UserId};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::api::RideApiServer;
use crate::context::RideContext;
use crate::error::to_rpc_error;
use crate::service::RideService;
use crate::types::*;

pub struct RideRpcServer {
    service: RideService,
}

impl RideRpcServer {
    pub fn new(ctx: RideContext) -> Self {
        Self { service: RideService::new(ctx) }
    }

    /// Starts the server with permissive CORS, matching the wide-open
    /// client base a mobility app's mobile/web clients both need.
    pub async fn start(self, addr: SocketAddr) -> anyhow::Result<ServerHandle> {
        let cors = CorsLayer::new().allow_methods(Any).allow_origin(Any).allow_headers(Any);

        let server = Server::builder()
            .set_http_middleware(tower::ServiceBuilder::new().layer(cors))
            .build(addr)
            .await?;

        let module = self.into_rpc();
        let handle = server.start(module);
        info!(%addr, "ride rpc server started");
        Ok(handle)
    }
}

#[async_trait]
impl RideApiServer for RideRpcServer {
    async fn rider_connect(&self, user_id: UserId, socket_id: String) -> RpcResult<()> {
        self.service.rider_connect(user_id, socket_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn rider_disconnect(&self, user_id: UserId) -> RpcResult<()> {
        self.service.rider_disconnect(user_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn driver_connect(&self, driver_id: DriverId, socket_id: String) -> RpcResult<()> {
        self.service.driver_connect(driver_id, socket_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn driver_disconnect(&self, driver_id: DriverId) -> RpcResult<()> {
        self.service.driver_disconnect(driver_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn driver_toggle_status(&self, driver_id: DriverId, is_active: bool) -> RpcResult<()> {
        self.service.driver_toggle_status(driver_id, is_active).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn driver_location_update(&self, params: LocationUpdateParams) -> RpcResult<()> {
        self.service.driver_location_update(params).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn request_ride(&self, params: RequestRideParams) -> RpcResult<Ride> {
        self.service.request_ride(params).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn ride_accept(&self, ride_id: RideId, driver_id: DriverId) -> RpcResult<Ride> {
        self.service.ride_accept(ride_id, driver_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn ride_reject(&self, ride_id: RideId, driver_id: DriverId) -> RpcResult<()> {
        self.service.ride_reject(ride_id, driver_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn driver_arrive(&self, ride_id: RideId, driver_id: DriverId) -> RpcResult<()> {
        self.service.driver_arrive(ride_id, driver_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn verify_start_otp(&self, ride_id: RideId, otp: String) -> RpcResult<OtpCheckResult> {
        self.service.verify_start_otp(ride_id, &otp).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn ride_started(&self, ride_id: RideId, otp: String) -> RpcResult<Ride> {
        self.service.ride_started(ride_id, otp).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn verify_stop_otp(&self, ride_id: RideId, otp: String) -> RpcResult<OtpCheckResult> {
        self.service.verify_stop_otp(ride_id, &otp).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn ride_completed(&self, params: CompleteRideParams) -> RpcResult<Ride> {
        self.service.ride_completed(params).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn cancel_ride(&self, params: CancelRideParams) -> RpcResult<()> {
        self.service.cancel_ride(params).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn join_ride_room(&self, caller: Participant, ride_id: RideId, socket_id: String) -> RpcResult<()> {
        self.service.join_ride_room(caller, ride_id, &socket_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn leave_ride_room(&self, ride_id: RideId, socket_id: String) -> RpcResult<()> {
        self.service.leave_ride_room(ride_id, &socket_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn send_message(&self, params: SendMessageParams) -> RpcResult<()> {
        self.service.send_message(params).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn mark_message_read(&self, user_id: UserId) -> RpcResult<()> {
        self.service.mark_message_read(user_id).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn get_ride_messages(&self, ride_id: RideId) -> RpcResult<Vec<()>> {
        Ok(self.service.get_ride_messages(ride_id))
    }

    async fn submit_rating(&self, params: SubmitRatingParams) -> RpcResult<()> {
        self.service.submit_rating(params).map_err(to_rpc_error).map_err(Into::into)
    }

    async fn emergency_alert(&self, params: EmergencyAlertParams) -> RpcResult<()> {
        self.service.emergency_alert(params).map_err(to_rpc_error).map_err(Into::into)
    }
}
