//! The Auto-Cancel Sweeper (`spec.md` §4.5): a periodic background task that
//! cancels rides stuck in `requested` past the wait timeout. Mirrors the
//! teacher's tick-driven background systems — a `tokio::time::interval` loop
//! rather than a cron job, since this is a single long-lived process.

use crate::pipeline::DispatchPipeline;
use ride_core::events::rooms;
use ride_core::ride::RideAction;
use ride_core::{CancelledBy, OutboundEvent, RideStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct Sweeper {
    pipeline: Arc<DispatchPipeline>,
}

impl Sweeper {
    /// Spawns the sweeper loop and returns immediately; the task runs for
    /// the lifetime of the process (or until its `JoinHandle` is aborted).
    pub fn spawn(pipeline: Arc<DispatchPipeline>) -> tokio::task::JoinHandle<()> {
        let sweeper = Self { pipeline };
        let check_interval = Duration::from_secs(
            (sweeper.pipeline.config().sweeper_check_interval_minutes.max(1) as u64) * 60,
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(check_interval);
            loop {
                ticker.tick().await;
                sweeper.sweep_once();
            }
        })
    }

    fn sweep_once(&self) {
        let config = self.pipeline.config();
        let timeout_secs = config.sweeper_timeout_minutes.max(0) * 60;
        let threshold = ride_core::now() - timeout_secs;

        let stale = self
            .pipeline
            .engine()
            .store()
            .requested_rides_older_than(threshold, config.sweeper_batch_size);

        for ride in stale {
            // Re-check status: another worker may have accepted or
            // cancelled it between the scan and this cancellation.
            let Some(current) = self.pipeline.engine().store().get_ride(ride.id) else { continue };
            if current.status != RideStatus::Requested {
                continue;
            }

            let waited_minutes = ((ride_core::now() - current.created_at).max(0)) / 60;
            let reason = format!("No driver accepted within {waited_minutes} minutes");

            let Ok(cancelled) = self.pipeline.engine().transition(
                ride.id,
                RideAction::Cancel { by: CancelledBy::System, reason: reason.clone(), now: ride_core::now() },
            ) else {
                continue;
            };

            info!(ride_id = %ride.id, waited_minutes, "auto-cancelled stale ride request");

            // §4.5 step 3: notify through the rider's last known socketId and
            // the user room for robustness. This workspace keeps a single
            // source of truth for socket ids on the User/Driver records
            // rather than denormalizing a third copy onto the Ride row
            // (design note §9, arena-of-ids), so the "stale socketId on the
            // Ride row" channel collapses into the rider-socket lookup here.
            let rider_socket = self.pipeline.engine().store().get_user(cancelled.rider_id).and_then(|u| u.socket_id);
            for event in [
                OutboundEvent::RideCancelled { ride_id: ride.id, cancelled_by: CancelledBy::System, reason: reason.clone() },
                OutboundEvent::NoDriverFound { ride_id: ride.id, reason: reason.clone() },
            ] {
                self.pipeline.bus().emit_to_room(&rooms::user(cancelled.rider_id), event.clone());
                if let Some(socket_id) = &rider_socket {
                    self.pipeline.bus().emit_direct(socket_id, event);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatchConfig;
    use ride_arbiter::Arbiter;
    use ride_core::booking::{BookingType, PaymentMethod};
    use ride_core::{Location, Money, Otp, RideId, UserId};
    use ride_events::Bus;
    use ride_presence::PresenceRegistry;
    use ride_store::{InMemoryLockStore, MemRideStore, RideEngine, RideStore};

    fn sample_fare_inputs() -> ride_core::ride::FareBreakdown {
        ride_core::ride::FareBreakdown {
            base_fare: Money::from_major(50.0),
            distance_fare: Money::from_major(40.0),
            time_fare: Money::from_major(10.0),
            discount: Money::ZERO,
            minimum_fare: Money::from_major(60.0),
        }
    }

    fn old_ride(created_at: i64) -> ride_core::ride::Ride {
        ride_core::ride::Ride::new(
            RideId::new(),
            UserId::new(),
            Location { lng: 0.0, lat: 0.0 },
            Location { lng: 1.0, lat: 1.0 },
            BookingType::Instant,
            PaymentMethod::Wallet,
            5.0,
            Money::from_major(100.0),
            sample_fare_inputs(),
            Otp("0471".into()),
            Otp("9126".into()),
            created_at,
        )
    }

    fn setup_pipeline() -> (Arc<DispatchPipeline>, Arc<dyn RideStore>) {
        let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
        let locks = Arc::new(InMemoryLockStore::new());
        let engine = Arc::new(RideEngine::new(store.clone(), locks.clone()));
        let presence = Arc::new(PresenceRegistry::new(store.clone(), Duration::from_secs(60)));
        let arbiter = Arc::new(Arbiter::new(locks));
        let bus = Arc::new(Bus::new(store.clone()));
        let config = DispatchConfig { sweeper_timeout_minutes: 5, ..DispatchConfig::default() };
        (DispatchPipeline::spawn(engine, presence, arbiter, bus, config), store)
    }

    #[tokio::test]
    async fn stale_requested_ride_is_cancelled_with_wait_duration_in_reason() {
        let (pipeline, store) = setup_pipeline();
        let ride = old_ride(ride_core::now() - 10 * 60);
        let ride = pipeline.engine().begin_ride(ride).unwrap();

        let sweeper = Sweeper { pipeline: pipeline.clone() };
        sweeper.sweep_once();

        let after = store.get_ride(ride.id).unwrap();
        assert_eq!(after.status, RideStatus::Cancelled);
        assert!(after.cancellation_reason.unwrap().contains("minutes"));
    }

    #[tokio::test]
    async fn fresh_requested_ride_is_left_alone() {
        let (pipeline, store) = setup_pipeline();
        let ride = old_ride(ride_core::now());
        let ride = pipeline.engine().begin_ride(ride).unwrap();

        let sweeper = Sweeper { pipeline: pipeline.clone() };
        sweeper.sweep_once();

        let after = store.get_ride(ride.id).unwrap();
        assert_eq!(after.status, RideStatus::Requested);
    }
}
