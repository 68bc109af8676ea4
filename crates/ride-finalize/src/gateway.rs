//! The Gateway: deliberately opaque per `spec.md` §1 ("Payment-gateway SDK
//! internals... treated as an opaque 'Gateway' with fetch/verify/refund
//! operations"). `ride-finalize` only ever calls this trait; a real
//! deployment swaps in an adapter over Stripe/Razorpay/whatever without
//! touching finalization logic.

use ride_core::{Money, RideError};

#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Fetches the payment captured against `payment_id` and returns its
    /// captured amount (`spec.md` §6's `fetchPayment` contract, narrowed to
    /// the one field the Reconciler needs). `expected_amount` is passed
    /// through for adapters that need it to look the payment up, not
    /// compared here — the caller does the `spec.md` §8 "reject mismatches
    /// > 0.01 minor-unit-equivalent" tolerance check against the result.
    /// `Err(RideError::Transient)` is a recoverable infra fault worth
    /// retrying; any other `Err` means the gateway itself reports the
    /// payment as declined/unverifiable.
    async fn verify_payment(&self, payment_id: &str, expected_amount: Money) -> Result<Money, RideError>;

    /// Requests an additional charge against the same payment method
    /// (fare went up after recomputation). Returns a new gateway
    /// transaction id.
    async fn charge_additional(&self, payment_id: &str, amount: Money) -> Result<String, RideError>;

    /// Schedules (does not necessarily execute synchronously) a refund of
    /// `amount` against `payment_id`. Returns a refund reference id.
    async fn refund(&self, payment_id: &str, amount: Money) -> Result<String, RideError>;
}

/// A deterministic stand-in used where no real gateway is wired up (tests,
/// local `ride-node` runs without payment credentials configured). Every
/// operation succeeds immediately and fabricates a reference id from the
/// inputs, so it's safe to use in integration tests that assert on the
/// `Ok` path without asserting on the literal id.
pub struct NullGateway;

#[async_trait::async_trait]
impl Gateway for NullGateway {
    async fn verify_payment(&self, _payment_id: &str, expected_amount: Money) -> Result<Money, RideError> {
        Ok(expected_amount)
    }

    async fn charge_additional(&self, payment_id: &str, amount: Money) -> Result<String, RideError> {
        Ok(format!("{payment_id}-charge-{amount}"))
    }

    async fn refund(&self, payment_id: &str, amount: Money) -> Result<String, RideError> {
        Ok(format!("{payment_id}-refund-{amount}"))
    }
}
