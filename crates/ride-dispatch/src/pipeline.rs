//! The Dispatch Pipeline (`spec.md` §4.1): `enqueue`/`process`, the
//! progressive-radius Matcher invocation, and the notification fan-out.
//! Matching algorithm selection mirrors the teacher's pluggable
//! `MatchingAlgorithm` trait — here it's `ride_geo::progressive_search`,
//! generalized to operate over a radius schedule rather than a single call.

use crate::candidates::{exclude, gather_candidates};
use crate::config::DispatchConfig;
use dashmap::DashSet;
use ride_arbiter::Arbiter;
use ride_core::events::rooms;
use ride_core::ride::RideAction;
use ride_core::{CancelledBy, OutboundEvent, RideId, RideStatus};
use ride_events::Bus;
use ride_geo::progressive_search;
use ride_presence::PresenceRegistry;
use ride_store::{RideEngine, RideStore};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub struct DispatchPipeline {
    engine: Arc<RideEngine>,
    presence: Arc<PresenceRegistry>,
    arbiter: Arc<Arbiter>,
    bus: Arc<Bus>,
    config: DispatchConfig,
    in_flight: Arc<DashSet<RideId>>,
    queue_tx: mpsc::UnboundedSender<RideId>,
    worker_token: String,
}

impl DispatchPipeline {
    /// Spawns the bounded worker pool (default concurrency 5) consuming the
    /// in-process job queue and returns the handle callers use to
    /// `enqueue`/`process` rides.
    pub fn spawn(
        engine: Arc<RideEngine>,
        presence: Arc<PresenceRegistry>,
        arbiter: Arc<Arbiter>,
        bus: Arc<Bus>,
        config: DispatchConfig,
    ) -> Arc<Self> {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let pipeline = Arc::new(Self {
            engine,
            presence,
            arbiter,
            bus,
            config,
            in_flight: Arc::new(DashSet::new()),
            queue_tx,
            worker_token: uuid::Uuid::new_v4().to_string(),
        });
        pipeline.spawn_worker_pool(queue_rx);
        pipeline
    }

    fn spawn_worker_pool(self: &Arc<Self>, queue_rx: mpsc::UnboundedReceiver<RideId>) {
        let queue_rx = Arc::new(tokio::sync::Mutex::new(queue_rx));
        for _ in 0..self.config.worker_pool_size {
            let pipeline = Arc::clone(self);
            let queue_rx = Arc::clone(&queue_rx);
            tokio::spawn(async move {
                loop {
                    let ride_id = { queue_rx.lock().await.recv().await };
                    match ride_id {
                        Some(ride_id) => pipeline.process(ride_id).await,
                        None => break,
                    }
                }
            });
        }
    }

    /// Idempotent by deterministic job id `ride:{rideId}` (modeled here as
    /// dedup against `in_flight`, since the job queue itself is keyed by
    /// `RideId`). A second `enqueue` for a ride already queued is a no-op.
    pub fn enqueue(&self, ride_id: RideId) {
        if !self.in_flight.insert(ride_id) {
            return;
        }
        if self.queue_tx.send(ride_id).is_err() {
            warn!(%ride_id, "dispatch queue closed, dropping enqueue");
            self.in_flight.remove(&ride_id);
        }
    }

    async fn process(&self, ride_id: RideId) {
        self.in_flight.remove(&ride_id);

        if !self.arbiter.try_acquire_worker_lock(ride_id, &self.worker_token) {
            return;
        }

        let outcome = self.process_locked(ride_id).await;
        if let Err(err) = outcome {
            warn!(%ride_id, ?err, "dispatch processing failed");
        }

        self.arbiter.release_worker_lock(ride_id, &self.worker_token);
    }

    async fn process_locked(&self, ride_id: RideId) -> Result<(), ride_core::RideError> {
        let ride = match self.engine.store().get_ride(ride_id) {
            Some(r) if r.status == RideStatus::Requested => r,
            _ => return Ok(()),
        };

        let candidates = gather_candidates(self.engine.store(), &self.presence);
        let rejected = exclude(&ride.rejected_drivers);
        let found = progressive_search(
            ride.pickup,
            &self.config.radii_km,
            &ride.booking_type,
            &candidates,
            &rejected,
            self.config.max_candidates,
        );

        match found {
            None => {
                let radius_used = self.config.radii_km.last().copied().unwrap_or(0.0);
                self.cancel_no_driver(ride_id, &format!("No drivers found within {radius_used} km"))
            }
            Some((scored, _radius_used)) => {
                self.notify_candidates(ride_id, scored.into_iter().map(|c| c.driver_id).collect())
            }
        }
    }

    /// §4.1 step 5: re-verify status before every outbound notification,
    /// emit `newRideRequest`, append to `notifiedDrivers`, flush once.
    /// `pub(crate)` so the rejection cascade in `rejection.rs` can re-notify
    /// the retry batch through the same path.
    pub(crate) fn notify_candidates(
        &self,
        ride_id: RideId,
        candidate_ids: Vec<ride_core::DriverId>,
    ) -> Result<(), ride_core::RideError> {
        let mut notified = Vec::new();
        for driver_id in candidate_ids {
            let Some(ride) = self.engine.store().get_ride(ride_id) else { break };
            if ride.status != RideStatus::Requested {
                break;
            }
            let Some(driver) = self.engine.store().get_driver(driver_id) else { continue };
            let Some(socket_id) = driver.socket_id.clone() else { continue };

            let ride_for_driver = ride.clone().redact_otps_for_driver();
            self.bus.emit_to_room(&rooms::driver(driver_id), OutboundEvent::NewRideRequest { ride: ride_for_driver.clone() });
            self.bus.emit_direct(&socket_id, OutboundEvent::NewRideRequest { ride: ride_for_driver });
            notified.push(driver_id);
            info!(%ride_id, %driver_id, "notified driver of ride request");
        }

        if let Some(mut ride) = self.engine.store().get_ride(ride_id) {
            for driver_id in notified {
                if !ride.notified_drivers.contains(&driver_id) {
                    ride.notified_drivers.push(driver_id);
                }
            }
            self.engine.store().put_ride(ride);
        }
        Ok(())
    }

    /// §4.1 step 4: notify the rider using their current `socketId` AND the
    /// user room `user_{id}` as belt-and-braces, since the rider may not yet
    /// have joined the room on this node.
    pub(crate) fn cancel_no_driver(&self, ride_id: RideId, reason: &str) -> Result<(), ride_core::RideError> {
        let ride = self.engine.transition(
            ride_id,
            RideAction::Cancel { by: CancelledBy::System, reason: reason.to_string(), now: ride_core::now() },
        )?;

        let rider_socket = self.engine.store().get_user(ride.rider_id).and_then(|u| u.socket_id);

        for event in [
            OutboundEvent::NoDriverFound { ride_id, reason: reason.to_string() },
            OutboundEvent::RideCancelled { ride_id, cancelled_by: CancelledBy::System, reason: reason.to_string() },
        ] {
            self.bus.emit_to_room(&rooms::user(ride.rider_id), event.clone());
            if let Some(socket_id) = &rider_socket {
                self.bus.emit_direct(socket_id, event);
            }
        }
        Ok(())
    }

    pub(crate) fn engine(&self) -> &Arc<RideEngine> {
        &self.engine
    }

    pub(crate) fn presence(&self) -> &Arc<PresenceRegistry> {
        &self.presence
    }

    pub(crate) fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    pub(crate) fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub(crate) fn arbiter(&self) -> &Arc<Arbiter> {
        &self.arbiter
    }
}
