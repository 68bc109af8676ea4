//! Bridges raw WebSocket frames (`ride_events::transport::serve_connection`)
//! to the same `RideService` the jsonrpsee surface uses. A frame is a bare
//! `{"method": "...", "params": {...}}` envelope; there is no per-call
//! response channel, so every outcome — success or failure — surfaces
//! through a `Bus` broadcast rather than a request/response pair. Methods
//! that are genuinely query/response in nature (`verifyStartOtp`,
//! `verifyStopOtp`, `getRideMessages`) are jsonrpsee-only: a caller that
//! needs the return value calls them over the RPC transport instead.

use async_trait::async_trait;
use ride_core::{DriverId, OutboundEvent, Participant, RideId, UserId};
use ride_events::{Bus, ConnectionHandler, ConnectionId, ConnectionIdentity};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::service::RideService;
use crate::types::*;

pub struct RideConnectionHandler {
    service: RideService,
    bus: Arc<Bus>,
}

impl RideConnectionHandler {
    pub fn new(service: RideService, bus: Arc<Bus>) -> Self {
        Self { service, bus }
    }

    fn reply_error(&self, connection_id: ConnectionId, message: impl Into<String>) {
        let Some(socket_id) = self.bus.socket_id_of(connection_id) else { return };
        self.bus.emit_direct(&socket_id, OutboundEvent::RideError {
            code: "SOCKET_COMMAND_FAILED",
            message: message.into(),
            ride_id: None,
        });
    }
}

#[derive(Deserialize)]
struct Frame {
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Deserialize)]
struct ConnectParams {
    user_id: Option<UserId>,
    driver_id: Option<DriverId>,
    socket_id: String,
}

#[derive(Deserialize)]
struct ToggleStatusParams {
    driver_id: DriverId,
    is_active: bool,
}

#[derive(Deserialize)]
struct RideActionParams {
    ride_id: RideId,
    driver_id: DriverId,
}

#[derive(Deserialize)]
struct RideOtpParams {
    ride_id: RideId,
    otp: String,
}

#[derive(Deserialize)]
struct RoomParams {
    ride_id: RideId,
    socket_id: String,
    #[serde(default)]
    caller: Option<Participant>,
}

#[derive(Deserialize)]
struct UserIdParams {
    user_id: UserId,
}

#[async_trait]
impl ConnectionHandler for RideConnectionHandler {
    async fn on_message(&self, connection_id: ConnectionId, raw: String) {
        let frame: Frame = match serde_json::from_str(&raw) {
            Ok(f) => f,
            Err(err) => {
                debug!(%connection_id, %err, "malformed socket frame");
                self.reply_error(connection_id, "malformed frame");
                return;
            }
        };

        let result = self.dispatch(&frame.method, frame.params);
        if let Err(message) = result {
            self.reply_error(connection_id, message);
        }
    }

    async fn on_disconnect(&self, _connection_id: ConnectionId, identity: ConnectionIdentity) {
        match identity {
            ConnectionIdentity::Rider(user_id) => {
                let _ = self.service.rider_disconnect(user_id);
            }
            ConnectionIdentity::Driver(driver_id) => {
                let _ = self.service.driver_disconnect(driver_id);
            }
            ConnectionIdentity::Admin => {}
        }
    }
}

impl RideConnectionHandler {
    fn dispatch(&self, method: &str, params: Value) -> Result<(), String> {
        let parse = |v: Value| -> Result<_, String> { serde_json::from_value(v).map_err(|e| e.to_string()) };

        match method {
            "riderConnect" => {
                let p: ConnectParams = parse(params)?;
                let user_id = p.user_id.ok_or("riderConnect requires user_id")?;
                self.service.rider_connect(user_id, p.socket_id).map_err(|e| e.to_string())
            }
            "driverConnect" => {
                let p: ConnectParams = parse(params)?;
                let driver_id = p.driver_id.ok_or("driverConnect requires driver_id")?;
                self.service.driver_connect(driver_id, p.socket_id).map_err(|e| e.to_string())
            }
            "driverToggleStatus" => {
                let p: ToggleStatusParams = parse(params)?;
                self.service.driver_toggle_status(p.driver_id, p.is_active).map_err(|e| e.to_string())
            }
            "driverLocationUpdate" => {
                let p: LocationUpdateParams = parse(params)?;
                self.service.driver_location_update(p).map_err(|e| e.to_string())
            }
            "newRideRequest" => {
                let p: RequestRideParams = parse(params)?;
                self.service.request_ride(p).map(|_| ()).map_err(|e| e.to_string())
            }
            "rideAccepted" => {
                let p: RideActionParams = parse(params)?;
                self.service.ride_accept(p.ride_id, p.driver_id).map(|_| ()).map_err(|e| e.to_string())
            }
            "rideRejected" => {
                let p: RideActionParams = parse(params)?;
                self.service.ride_reject(p.ride_id, p.driver_id).map_err(|e| e.to_string())
            }
            "driverArrived" => {
                let p: RideActionParams = parse(params)?;
                self.service.driver_arrive(p.ride_id, p.driver_id).map_err(|e| e.to_string())
            }
            "rideStarted" => {
                let p: RideOtpParams = parse(params)?;
                self.service.ride_started(p.ride_id, p.otp).map(|_| ()).map_err(|e| e.to_string())
            }
            "rideCompleted" => {
                let p: CompleteRideParams = parse(params)?;
                self.service.ride_completed(p).map(|_| ()).map_err(|e| e.to_string())
            }
            "rideCancelled" => {
                let p: CancelRideParams = parse(params)?;
                self.service.cancel_ride(p).map_err(|e| e.to_string())
            }
            "joinRideRoom" => {
                let p: RoomParams = parse(params)?;
                let caller = p.caller.ok_or("joinRideRoom requires caller")?;
                self.service.join_ride_room(caller, p.ride_id, &p.socket_id).map_err(|e| e.to_string())
            }
            "leaveRideRoom" => {
                let p: RoomParams = parse(params)?;
                self.service.leave_ride_room(p.ride_id, &p.socket_id).map_err(|e| e.to_string())
            }
            "sendMessage" => {
                let p: SendMessageParams = parse(params)?;
                self.service.send_message(p).map_err(|e| e.to_string())
            }
            "markMessageRead" => {
                let p: UserIdParams = parse(params)?;
                self.service.mark_message_read(p.user_id).map_err(|e| e.to_string())
            }
            "submitRating" => {
                let p: SubmitRatingParams = parse(params)?;
                self.service.submit_rating(p).map_err(|e| e.to_string())
            }
            "emergencyAlert" => {
                let p: EmergencyAlertParams = parse(params)?;
                self.service.emergency_alert(p).map_err(|e| e.to_string())
            }
            "verifyStartOtp" | "verifyStopOtp" | "getRideMessages" | "riderDisconnect" | "driverDisconnect" => {
                warn!(method, "query-style or identity-teardown method received over raw socket frame, ignoring");
                Err(format!("{method} must be called over the RPC transport"))
            }
            other => {
                warn!(method = other, "unknown socket frame method");
                Err(format!("unknown method {other}"))
            }
        }
    }
}
