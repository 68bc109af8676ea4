//! The Earnings Finalizer (`spec.md` §4.7): idempotent fare recomputation,
//! hybrid wallet/gateway reconciliation, and the `AdminEarnings` upsert that
//! feeds payouts. Triggered once per ride on the `completeRide` transition;
//! safe under redelivery because the `AdminEarnings` row (E2) is the
//! idempotence gate — a ride that already has one is a no-op.

use crate::gateway::Gateway;
use ride_core::error::codes;
use ride_core::ride::Ride;
use ride_core::{
    AdminEarnings, Money, OutboundEvent, PaymentMethod, PaymentStatus, RideError, RideId,
    WalletTransaction, WalletTransactionStatus, WalletTransactionType,
};
use ride_core::events::rooms;
use ride_events::Bus;
use ride_store::RideStore;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Finalizer {
    store: Arc<dyn RideStore>,
    gateway: Arc<dyn Gateway>,
    bus: Arc<Bus>,
}

impl Finalizer {
    pub fn new(store: Arc<dyn RideStore>, gateway: Arc<dyn Gateway>, bus: Arc<Bus>) -> Self {
        Self { store, gateway, bus }
    }

    /// Runs `finalize` with the §4.7 backoff schedule (1s/2s/3s) for
    /// `Transient` failures; any other error class aborts immediately.
    pub async fn finalize_with_retry(&self, ride_id: RideId) -> Result<(), RideError> {
        for (attempt, backoff) in ride_core::constants::FINALIZE_RETRY_BACKOFFS_SECS.iter().enumerate() {
            match self.finalize(ride_id).await {
                Ok(()) => return Ok(()),
                Err(err @ RideError::Transient { .. }) => {
                    warn!(%ride_id, attempt, ?err, "finalize attempt failed, retrying");
                    tokio::time::sleep(std::time::Duration::from_secs(*backoff)).await;
                }
                Err(err) => return Err(err),
            }
        }
        self.finalize(ride_id).await
    }

    pub async fn finalize(&self, ride_id: RideId) -> Result<(), RideError> {
        if self.store.get_admin_earnings(ride_id).is_some() {
            // E2/idempotence: already finalized, nothing left to do.
            return Ok(());
        }

        let mut ride = self
            .store
            .get_ride(ride_id)
            .ok_or_else(|| RideError::validation("RIDE_NOT_FOUND", "no such ride"))?;

        if ride.status != ride_core::RideStatus::Completed {
            return Err(RideError::business(
                "RIDE_NOT_COMPLETED",
                "finalize called before ride reached completed",
            ));
        }

        if ride.payment_method == PaymentMethod::Gateway {
            self.verify_gateway_payment(&ride).await?;
        }

        let new_fare = ride.fare_inputs.recompute();
        let fare_delta = new_fare - ride.fare;
        if fare_delta.0 != 0 {
            ride.fare = new_fare;
        }

        if fare_delta.0 != 0 && ride.payment_method != PaymentMethod::Cash {
            match ride.payment_method {
                PaymentMethod::Wallet => self.reconcile_wallet(&mut ride, fare_delta)?,
                PaymentMethod::Gateway => self.reconcile_gateway(&mut ride, fare_delta).await?,
                PaymentMethod::Cash => unreachable!("guarded above"),
            }
        }

        self.store.put_ride(ride.clone());

        let settings = self.store.get_settings();
        settings.validate()?;

        let platform_fee = new_fare.percent_of(settings.platform_fee_pct);
        // Remainder attributed to driverEarning so platformFee + driverEarning == fare exactly.
        let driver_earning = new_fare - platform_fee;

        let Some(driver_id) = ride.driver_id else {
            return Err(RideError::fatal("completed ride has no assigned driver"));
        };

        let earnings = AdminEarnings {
            ride_id,
            driver_id,
            rider_id: ride.rider_id,
            gross_fare: new_fare,
            platform_fee,
            driver_earning,
            ride_date: ride.actual_end_time.unwrap_or(ride.updated_at),
            payment_status: PaymentStatus::Completed,
        };
        if !earnings.satisfies_split_invariant() {
            return Err(RideError::fatal("platformFee + driverEarning != grossFare at write time"));
        }

        self.store.upsert_admin_earnings(earnings);

        info!(%ride_id, %driver_id, earning = %driver_earning, "driver earning recorded");
        self.bus.emit_to_room(&rooms::driver(driver_id), OutboundEvent::DriverEarningAdded {
            driver_id,
            ride_id,
            amount: driver_earning,
        });

        Ok(())
    }

    /// Fare/Payment Reconciler's gateway amount check (`spec.md` §2, §8):
    /// fetches the captured payment and rejects outright — before any fare
    /// delta reconciliation runs — if the ride has nothing to verify, the
    /// gateway itself can't confirm it, or the captured amount drifts from
    /// `fare` by more than a cent.
    async fn verify_gateway_payment(&self, ride: &Ride) -> Result<(), RideError> {
        let Some(payment_id) = ride.gateway_payment_id.clone() else {
            return Err(RideError::business(
                codes::PAYMENT_NOT_VERIFIED,
                "gateway ride has no recorded payment id to verify",
            ));
        };

        let captured = self.gateway.verify_payment(&payment_id, ride.fare).await.map_err(|err| {
            if err.is_retryable() {
                err
            } else {
                RideError::business(
                    codes::PAYMENT_VERIFICATION_FAILED,
                    format!("gateway could not verify payment {payment_id}: {err}"),
                )
            }
        })?;

        if !captured.within_tolerance(ride.fare, 1) {
            return Err(RideError::business(
                codes::PAYMENT_AMOUNT_MISMATCH,
                format!("captured amount {captured} does not match fare {}", ride.fare),
            ));
        }
        Ok(())
    }

    /// WALLET reconciliation: a `fareDelta > 0` debits the rider an
    /// additional `RIDE_PAYMENT`; `fareDelta < 0` credits a `REFUND`. W3
    /// guards against a double hybrid debit for the same ride.
    fn reconcile_wallet(&self, ride: &mut Ride, fare_delta: Money) -> Result<(), RideError> {
        let hybrid = ride.wallet_amount_used.0 > 0 && ride.gateway_amount_paid.0 > 0;
        if hybrid
            && self
                .store
                .wallet_transactions_for_ride(ride.id)
                .iter()
                .any(|tx| tx.tx_type == WalletTransactionType::RidePayment && tx.hybrid_payment)
        {
            return Err(RideError::fatal(
                "W3 violation: a hybrid ride payment already exists for this ride",
            ));
        }

        let Some(mut user) = self.store.get_user(ride.rider_id) else {
            return Err(RideError::fatal("wallet reconciliation: rider record missing"));
        };

        let amount = fare_delta.abs();
        let tx_type = if fare_delta.0 > 0 { WalletTransactionType::RidePayment } else { WalletTransactionType::Refund };
        let balance_before = user.wallet_balance;
        let balance_after = if tx_type.is_credit() { balance_before + amount } else { balance_before - amount };

        let tx = WalletTransaction {
            user_id: user.id,
            tx_type,
            amount,
            balance_before,
            balance_after,
            status: WalletTransactionStatus::Completed,
            ride_id: Some(ride.id),
            hybrid_payment: hybrid,
        };
        self.store.append_wallet_transaction(tx)?;

        user.wallet_balance = balance_after;
        self.store.put_user(user);

        ride.wallet_amount_used = if tx_type == WalletTransactionType::RidePayment {
            ride.wallet_amount_used + amount
        } else {
            ride.wallet_amount_used.checked_sub(amount).unwrap_or(Money::ZERO)
        };
        ride.payment_status = PaymentStatus::Completed;
        Ok(())
    }

    /// GATEWAY reconciliation: an undercharge requests an additional
    /// capture and marks `paymentStatus=partial` until it clears; an
    /// overcharge schedules a refund. `gateway_payment_id` is already
    /// confirmed present by `verify_gateway_payment` before `finalize`
    /// reaches here; the check is kept so this method stays correct if
    /// ever called on its own.
    async fn reconcile_gateway(&self, ride: &mut Ride, fare_delta: Money) -> Result<(), RideError> {
        let Some(payment_id) = ride.gateway_payment_id.clone() else {
            return Err(RideError::business(
                codes::PAYMENT_NOT_VERIFIED,
                "gateway ride has no recorded payment id",
            ));
        };

        if fare_delta.0 > 0 {
            self.gateway.charge_additional(&payment_id, fare_delta).await?;
            ride.payment_status = PaymentStatus::Partial;
        } else {
            self.gateway.refund(&payment_id, fare_delta.abs()).await?;
            ride.payment_status = PaymentStatus::Completed;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::NullGateway;
    use ride_core::booking::{BookingType, PaymentMethod};
    use ride_core::ride::FareBreakdown;
    use ride_core::{DriverId, Location, Otp, Settings, User, UserId};
    use ride_store::MemRideStore;

    fn setup() -> (Finalizer, Arc<dyn RideStore>, RideId, UserId, DriverId) {
        let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
        store.put_settings(Settings::default());
        let bus = Arc::new(Bus::new(store.clone()));
        let finalizer = Finalizer::new(store.clone(), Arc::new(NullGateway), bus);

        let rider = UserId::new();
        let driver = DriverId::new();
        store.put_user(User::new(rider));

        let mut ride = Ride::new(
            RideId::new(),
            rider,
            Location { lng: 0.0, lat: 0.0 },
            Location { lng: 1.0, lat: 1.0 },
            BookingType::Instant,
            PaymentMethod::Wallet,
            5.0,
            Money::from_major(250.0),
            FareBreakdown {
                base_fare: Money::from_major(100.0),
                distance_fare: Money::from_major(150.0),
                time_fare: Money::ZERO,
                discount: Money::ZERO,
                minimum_fare: Money::from_major(60.0),
            },
            Otp("0471".into()),
            Otp("9126".into()),
            1000,
        );
        ride.status = ride_core::RideStatus::Completed;
        ride.driver_id = Some(driver);
        ride.actual_end_time = Some(2000);
        store.put_ride(ride.clone());

        (finalizer, store, ride.id, rider, driver)
    }

    #[tokio::test]
    async fn first_finalize_writes_earnings_with_correct_split() {
        let (finalizer, store, ride_id, _rider, driver) = setup();
        finalizer.finalize(ride_id).await.unwrap();

        let earnings = store.get_admin_earnings(ride_id).unwrap();
        assert_eq!(earnings.driver_id, driver);
        assert!(earnings.satisfies_split_invariant());
        assert_eq!(earnings.gross_fare, Money::from_major(250.0));
        assert_eq!(earnings.platform_fee, Money::from_major(50.0));
        assert_eq!(earnings.driver_earning, Money::from_major(200.0));
    }

    #[tokio::test]
    async fn repeat_finalize_is_a_no_op() {
        let (finalizer, store, ride_id, _rider, _driver) = setup();
        finalizer.finalize(ride_id).await.unwrap();
        let first = store.get_admin_earnings(ride_id).unwrap();

        finalizer.finalize(ride_id).await.unwrap();
        let second = store.get_admin_earnings(ride_id).unwrap();

        assert_eq!(first.gross_fare, second.gross_fare);
        assert_eq!(first.driver_earning, second.driver_earning);
    }

    #[tokio::test]
    async fn fare_delta_debits_wallet_and_updates_balance() {
        let (finalizer, store, ride_id, rider, _driver) = setup();
        // Bump base fare so recomputed fare (300) exceeds the stored quote (250).
        let mut ride = store.get_ride(ride_id).unwrap();
        ride.fare_inputs.base_fare = Money::from_major(150.0);
        store.put_ride(ride);

        let mut user = store.get_user(rider).unwrap();
        user.wallet_balance = Money::from_major(500.0);
        store.put_user(user);

        finalizer.finalize(ride_id).await.unwrap();

        let user_after = store.get_user(rider).unwrap();
        assert_eq!(user_after.wallet_balance, Money::from_major(450.0));

        let ride_after = store.get_ride(ride_id).unwrap();
        assert_eq!(ride_after.fare, Money::from_major(300.0));
    }

    /// Reports a fixed captured amount regardless of what's asked for, so
    /// tests can exercise the tolerance check from both sides.
    struct FixedCaptureGateway(Money);

    #[async_trait::async_trait]
    impl Gateway for FixedCaptureGateway {
        async fn verify_payment(&self, _payment_id: &str, _expected_amount: Money) -> Result<Money, RideError> {
            Ok(self.0)
        }
        async fn charge_additional(&self, payment_id: &str, amount: Money) -> Result<String, RideError> {
            Ok(format!("{payment_id}-charge-{amount}"))
        }
        async fn refund(&self, payment_id: &str, amount: Money) -> Result<String, RideError> {
            Ok(format!("{payment_id}-refund-{amount}"))
        }
    }

    fn gateway_ride_setup(gateway: Arc<dyn Gateway>, payment_id: Option<&str>) -> (Finalizer, Arc<dyn RideStore>, RideId) {
        let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
        store.put_settings(Settings::default());
        let bus = Arc::new(Bus::new(store.clone()));
        let finalizer = Finalizer::new(store.clone(), gateway, bus);

        let rider = UserId::new();
        let driver = DriverId::new();
        store.put_user(User::new(rider));

        let mut ride = Ride::new(
            RideId::new(),
            rider,
            Location { lng: 0.0, lat: 0.0 },
            Location { lng: 1.0, lat: 1.0 },
            BookingType::Instant,
            PaymentMethod::Gateway,
            5.0,
            Money::from_major(250.0),
            FareBreakdown {
                base_fare: Money::from_major(100.0),
                distance_fare: Money::from_major(150.0),
                time_fare: Money::ZERO,
                discount: Money::ZERO,
                minimum_fare: Money::from_major(60.0),
            },
            Otp("0471".into()),
            Otp("9126".into()),
            1000,
        );
        ride.status = ride_core::RideStatus::Completed;
        ride.driver_id = Some(driver);
        ride.actual_end_time = Some(2000);
        ride.gateway_payment_id = payment_id.map(str::to_string);
        store.put_ride(ride.clone());

        (finalizer, store, ride.id)
    }

    #[tokio::test]
    async fn gateway_amount_mismatch_beyond_tolerance_is_rejected() {
        let (finalizer, store, ride_id) = gateway_ride_setup(
            Arc::new(FixedCaptureGateway(Money::from_major(240.0))),
            Some("pay_1"),
        );

        let err = finalizer.finalize(ride_id).await.unwrap_err();
        assert_eq!(err.wire_code(), Some(codes::PAYMENT_AMOUNT_MISMATCH));
        assert!(store.get_admin_earnings(ride_id).is_none());
    }

    #[tokio::test]
    async fn gateway_amount_within_one_cent_tolerance_is_accepted() {
        let (finalizer, store, ride_id) = gateway_ride_setup(
            Arc::new(FixedCaptureGateway(Money(Money::from_major(250.0).0 + 1))),
            Some("pay_2"),
        );

        finalizer.finalize(ride_id).await.unwrap();
        assert!(store.get_admin_earnings(ride_id).is_some());
    }

    #[tokio::test]
    async fn gateway_ride_with_no_payment_id_is_rejected() {
        let (finalizer, store, ride_id) = gateway_ride_setup(Arc::new(NullGateway), None);

        let err = finalizer.finalize(ride_id).await.unwrap_err();
        assert_eq!(err.wire_code(), Some(codes::PAYMENT_NOT_VERIFIED));
        assert!(store.get_admin_earnings(ride_id).is_none());
    }
}
