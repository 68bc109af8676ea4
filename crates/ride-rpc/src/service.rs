//! `RideService`: the orchestration behind every inbound wire event. Both
//! the jsonrpsee `RideApiServer` impl (`server.rs`) and the raw-frame
//! `ConnectionHandler` (`handler.rs`) are thin adapters over these methods,
//! so the business logic is written once regardless of which transport a
//! caller came in on (a standalone JSON-RPC client, or a socket riding
//! through `ride-events::transport`).

use crate::context::RideContext;
use crate::types::*;
use ride_core::events::rooms;
use ride_core::ride::{Ride, RideAction};
use ride_core::{DriverId, OutboundEvent, Participant, RideError, RideId, RideStatus, UserId};
use tracing::{info, warn};

pub struct RideService {
    ctx: RideContext,
}

impl RideService {
    pub fn new(ctx: RideContext) -> Self {
        Self { ctx }
    }

    fn ride_or_not_found(&self, ride_id: RideId) -> Result<Ride, RideError> {
        self.ctx
            .engine
            .store()
            .get_ride(ride_id)
            .ok_or_else(|| RideError::validation("RIDE_NOT_FOUND", "no such ride"))
    }

    // ---- identity binding (riderConnect / driverConnect / *Disconnect) ----

    /// Binds a rider's durable `User.socketId` to an already-open connection.
    /// Room membership itself is established at WebSocket-upgrade time by
    /// `ride_events::transport::serve_connection`; this call only keeps the
    /// durable record (used for `emit_direct` fallback) in sync.
    pub fn rider_connect(&self, user_id: UserId, socket_id: String) -> Result<(), RideError> {
        let mut user = self
            .ctx
            .engine
            .store()
            .get_user(user_id)
            .ok_or_else(|| RideError::validation("USER_NOT_FOUND", "no such rider"))?;
        user.socket_id = Some(socket_id);
        self.ctx.engine.store().put_user(user);
        Ok(())
    }

    pub fn rider_disconnect(&self, user_id: UserId) -> Result<(), RideError> {
        if let Some(mut user) = self.ctx.engine.store().get_user(user_id) {
            user.socket_id = None;
            self.ctx.engine.store().put_user(user);
        }
        Ok(())
    }

    pub fn driver_connect(&self, driver_id: DriverId, socket_id: String) -> Result<(), RideError> {
        self.ctx.presence.reconnect(driver_id, socket_id, ride_core::now());
        Ok(())
    }

    pub fn driver_disconnect(&self, driver_id: DriverId) -> Result<(), RideError> {
        self.ctx.presence.disconnect(driver_id);
        self.ctx.bus.emit_to_room(rooms::ADMIN, OutboundEvent::DriverStatusUpdate {
            driver_id,
            is_active: false,
        });
        Ok(())
    }

    pub fn driver_toggle_status(&self, driver_id: DriverId, is_active: bool) -> Result<(), RideError> {
        let mut driver = self
            .ctx
            .engine
            .store()
            .get_driver(driver_id)
            .ok_or_else(|| RideError::validation("DRIVER_NOT_FOUND", "no such driver"))?;
        driver.is_active = is_active;
        self.ctx.engine.store().put_driver(driver);
        self.ctx.bus.emit_to_room(rooms::ADMIN, OutboundEvent::DriverStatusUpdate { driver_id, is_active });
        Ok(())
    }

    /// Refreshes the hot presence cache on every location ping, and
    /// additionally fans out to the ride room when the driver is mid-trip.
    pub fn driver_location_update(&self, params: LocationUpdateParams) -> Result<(), RideError> {
        let LocationUpdateParams { driver_id, location, ride_id } = params;
        let driver = self
            .ctx
            .engine
            .store()
            .get_driver(driver_id)
            .ok_or_else(|| RideError::validation("DRIVER_NOT_FOUND", "no such driver"))?;

        self.ctx.presence.heartbeat(driver_id, ride_presence::CachedPresence {
            socket_id: driver.socket_id.clone(),
            is_online: driver.is_online,
            is_active: driver.is_active,
            last_seen: ride_core::now(),
            location,
        });

        let mut updated = driver;
        updated.location = location;
        updated.last_seen = ride_core::now();
        self.ctx.engine.store().put_driver(updated);

        self.ctx.bus.emit_to_room(&rooms::driver(driver_id), OutboundEvent::DriverLocationUpdate { driver_id, location });

        if let Some(ride_id) = ride_id {
            if let Some(ride) = self.ctx.engine.store().get_ride(ride_id) {
                if ride.driver_id == Some(driver_id) && ride.status.is_active() {
                    self.ctx.bus.emit_to_room(&rooms::ride(ride_id), OutboundEvent::RideLocationUpdate { ride_id, location });
                }
            }
        }
        Ok(())
    }

    // ---- ride lifecycle ----

    /// The rider-initiated ride request. Distinct from
    /// `OutboundEvent::NewRideRequest`, the driver-facing dispatch
    /// notification that shares a name in the wire catalogue — see
    /// `DESIGN.md`.
    pub fn request_ride(&self, params: RequestRideParams) -> Result<Ride, RideError> {
        let (start_otp, stop_otp) = ride_crypto::mint_ride_otps();
        let ride = Ride::new(
            RideId::new(),
            params.rider_id,
            params.pickup,
            params.dropoff,
            params.booking_type,
            params.payment_method,
            params.distance_km,
            params.fare,
            params.fare_inputs,
            start_otp,
            stop_otp,
            ride_core::now(),
        );

        let ride = self.ctx.engine.begin_ride(ride)?;

        self.ctx.bus.emit_to_room(&rooms::user(ride.rider_id), OutboundEvent::RideRequested { ride: ride.clone() });
        self.ctx.dispatch.enqueue(ride.id);
        info!(ride_id = %ride.id, rider_id = %ride.rider_id, "ride requested");
        Ok(ride)
    }

    pub fn ride_accept(&self, ride_id: RideId, driver_id: DriverId) -> Result<Ride, RideError> {
        self.ctx.dispatch.handle_acceptance(ride_id, driver_id)?;
        self.ride_or_not_found(ride_id)
    }

    pub fn ride_reject(&self, ride_id: RideId, driver_id: DriverId) -> Result<(), RideError> {
        self.ctx.dispatch.handle_rejection(ride_id, driver_id)
    }

    pub fn driver_arrive(&self, ride_id: RideId, driver_id: DriverId) -> Result<(), RideError> {
        let ride = self.ctx.engine.transition(ride_id, RideAction::Arrive { by: driver_id, now: ride_core::now() })?;
        self.ctx.bus.emit_to_room(&rooms::user(ride.rider_id), OutboundEvent::DriverArrived { ride_id });
        Ok(())
    }

    /// A pure check: calling this alone must never change Ride state.
    pub fn verify_start_otp(&self, ride_id: RideId, otp: &str) -> Result<OtpCheckResult, RideError> {
        let ride = self.ride_or_not_found(ride_id)?;
        Ok(OtpCheckResult { success: ride_crypto::verify_otp(otp, &ride.start_otp) })
    }

    pub fn ride_started(&self, ride_id: RideId, otp: String) -> Result<Ride, RideError> {
        let result = self.ctx.engine.transition(
            ride_id,
            RideAction::StartRide { otp: ride_core::ride::Otp(otp), now: ride_core::now() },
        );

        match result {
            Ok(ride) => {
                self.ctx.bus.emit_to_room(&rooms::user(ride.rider_id), OutboundEvent::RideStarted { ride_id });
                if let Some(driver_id) = ride.driver_id {
                    self.ctx.bus.emit_to_room(&rooms::driver(driver_id), OutboundEvent::OtpVerified {
                        success: true,
                        ride: ride.clone().redact_otps_for_driver(),
                    });
                }
                Ok(ride)
            }
            Err(err) => {
                if matches!(err, RideError::Validation { .. }) {
                    if let Some(driver_id) = self.ctx.engine.store().get_ride(ride_id).and_then(|r| r.driver_id) {
                        self.ctx.bus.emit_to_room(&rooms::driver(driver_id), OutboundEvent::OtpVerificationFailed {
                            message: "start otp did not match".into(),
                        });
                    }
                }
                Err(err)
            }
        }
    }

    pub fn verify_stop_otp(&self, ride_id: RideId, otp: &str) -> Result<OtpCheckResult, RideError> {
        let ride = self.ride_or_not_found(ride_id)?;
        Ok(OtpCheckResult { success: ride_crypto::verify_otp(otp, &ride.stop_otp) })
    }

    /// Transitions to `completed`, then spawns the Finalizer off the hot
    /// path (it never blocks the state machine) and emits `rideCompleted`
    /// immediately — earnings accrual is observed later via
    /// `driverEarningAdded`.
    pub fn ride_completed(&self, params: CompleteRideParams) -> Result<Ride, RideError> {
        let result = self.ctx.engine.transition(
            params.ride_id,
            RideAction::CompleteRide {
                otp: ride_core::ride::Otp(params.otp),
                fare_override: params.fare_override,
                now: ride_core::now(),
            },
        );

        let ride = match result {
            Ok(ride) => ride,
            Err(err) => {
                if matches!(err, RideError::Validation { .. }) {
                    if let Some(driver_id) = self.ctx.engine.store().get_ride(params.ride_id).and_then(|r| r.driver_id) {
                        self.ctx.bus.emit_to_room(&rooms::driver(driver_id), OutboundEvent::OtpVerificationFailed {
                            message: "stop otp did not match".into(),
                        });
                    }
                }
                return Err(err);
            }
        };

        self.ctx.bus.emit_to_room(&rooms::user(ride.rider_id), OutboundEvent::RideCompleted { ride: ride.clone() });
        if let Some(driver_id) = ride.driver_id {
            self.ctx.bus.emit_to_room(
                &rooms::driver(driver_id),
                OutboundEvent::RideCompleted { ride: ride.clone().redact_otps_for_driver() },
            );
        }

        let finalizer = self.ctx.finalizer.clone();
        let ride_id = ride.id;
        tokio::spawn(async move {
            if let Err(err) = finalizer.finalize_with_retry(ride_id).await {
                warn!(%ride_id, ?err, "earnings finalize failed after retries");
            }
        });

        Ok(ride)
    }

    /// Rider- or driver-initiated cancellation (`cancelledBy in {rider,
    /// driver}`), distinct from the sweeper's and dispatch pipeline's
    /// system-initiated cancel paths already wired in `ride-dispatch`.
    pub fn cancel_ride(&self, params: CancelRideParams) -> Result<(), RideError> {
        let before = self.ride_or_not_found(params.ride_id)?;
        let notified = before.notified_drivers;
        let was_requested = before.status == RideStatus::Requested;

        let ride = self.ctx.engine.transition(
            params.ride_id,
            RideAction::Cancel { by: params.by, reason: params.reason.clone(), now: ride_core::now() },
        )?;

        self.ctx.bus.emit_to_room(&rooms::user(ride.rider_id), OutboundEvent::RideCancelled {
            ride_id: ride.id,
            cancelled_by: params.by,
            reason: params.reason.clone(),
        });
        if let Some(driver_id) = ride.driver_id {
            self.ctx.bus.emit_to_room(&rooms::driver(driver_id), OutboundEvent::RideCancelled {
                ride_id: ride.id,
                cancelled_by: params.by,
                reason: params.reason,
            });
        }

        if was_requested {
            for driver_id in notified {
                self.ctx.bus.emit_to_room(&rooms::driver(driver_id), OutboundEvent::RideNoLongerAvailable { ride_id: ride.id });
            }
        }
        Ok(())
    }

    pub fn join_ride_room(&self, caller: Participant, ride_id: RideId, socket_id: &str) -> Result<(), RideError> {
        if !self.ctx.bus.authorize_ride_event(caller, ride_id) {
            return Err(RideError::validation("NOT_AUTHORIZED", "caller is not a participant of this ride"));
        }
        let Some(connection_id) = self.ctx.bus.connection_for_socket(socket_id) else {
            return Err(RideError::validation("CONNECTION_NOT_FOUND", "no live connection for this socket"));
        };
        self.ctx.bus.join_room(connection_id, &rooms::ride(ride_id));
        Ok(())
    }

    pub fn leave_ride_room(&self, ride_id: RideId, socket_id: &str) -> Result<(), RideError> {
        let Some(connection_id) = self.ctx.bus.connection_for_socket(socket_id) else {
            return Ok(());
        };
        self.ctx.bus.leave_room(connection_id, &rooms::ride(ride_id));
        Ok(())
    }

    // ---- messaging / rating / safety (thin pass-throughs, no store) ----

    pub fn send_message(&self, params: SendMessageParams) -> Result<(), RideError> {
        if !self.ctx.bus.authorize_ride_event(params.sender, params.ride_id) {
            return Err(RideError::validation("NOT_AUTHORIZED", "caller is not a participant of this ride"));
        }
        self.ctx.bus.emit_to_room(&rooms::ride(params.ride_id), OutboundEvent::ReceiveMessage {
            ride_id: params.ride_id,
            sender: params.sender,
            body: params.body,
            sent_at: ride_core::now(),
        });
        Ok(())
    }

    /// No message store exists (chat history isn't persisted server-side),
    /// so this can only acknowledge receipt to whichever room is watching
    /// the counter; the actual unread count is tracked client-side.
    pub fn mark_message_read(&self, user_id: UserId) -> Result<(), RideError> {
        self.ctx.bus.emit_to_room(&rooms::user(user_id), OutboundEvent::UnreadCountUpdated { user_id, count: 0 });
        Ok(())
    }

    pub fn get_ride_messages(&self, ride_id: RideId) -> Vec<()> {
        let _ = ride_id;
        Vec::new()
    }

    pub fn submit_rating(&self, params: SubmitRatingParams) -> Result<(), RideError> {
        if !self.ctx.bus.authorize_ride_event(params.rater, params.ride_id) {
            return Err(RideError::validation("NOT_AUTHORIZED", "caller is not a participant of this ride"));
        }
        let ride = self.ride_or_not_found(params.ride_id)?;
        if ride.status != RideStatus::Completed {
            return Err(RideError::business("RATING_BEFORE_COMPLETION", "ride has not completed yet"));
        }
        self.ctx.bus.emit_to_room(&rooms::ride(params.ride_id), OutboundEvent::RatingReceived {
            ride_id: params.ride_id,
            stars: params.stars,
            comment: params.comment,
        });
        Ok(())
    }

    pub fn emergency_alert(&self, params: EmergencyAlertParams) -> Result<(), RideError> {
        if !self.ctx.bus.authorize_ride_event(params.raised_by, params.ride_id) {
            return Err(RideError::validation("NOT_AUTHORIZED", "caller is not a participant of this ride"));
        }
        let event = OutboundEvent::EmergencyAlert {
            ride_id: params.ride_id,
            raised_by: params.raised_by,
            location: params.location,
            reason: params.reason,
        };
        self.ctx.bus.emit_to_room(rooms::ADMIN, event.clone());
        self.ctx.bus.emit_to_room(&rooms::ride(params.ride_id), event);
        Ok(())
    }
}
