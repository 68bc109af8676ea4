//! The five-way error taxonomy, as explicit constructors
//! rather than thrown exceptions. Every variant carries the stable wire
//! `code` a client is allowed to see; server-side context (ids, causes)
//! stays on the `tracing` side of the boundary, never in `message`.

use crate::ids::RideId;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum RideError {
    /// Bad input, unknown status, malformed OTP — reported synchronously,
    /// no state change.
    #[error("validation failed: {message}")]
    Validation { code: &'static str, message: String },

    /// Lock not acquired, precondition violated on re-read — non-fatal.
    #[error("concurrency conflict: {message}")]
    Concurrency {
        code: &'static str,
        message: String,
        ride_id: Option<RideId>,
    },

    /// Cache/store timeout, pub/sub hiccup — caller decides whether to retry.
    #[error("transient infrastructure failure: {message}")]
    Transient { message: String },

    /// Insufficient wallet balance, expired token, ride already terminal.
    #[error("business rule violated: {message}")]
    Business { code: &'static str, message: String },

    /// An invariant (I1–I5, E1–E3, W1–W3) would be broken. The caller must
    /// abort the operation and never silently correct fare or ledger state.
    #[error("invariant violation: {message}")]
    Fatal { message: String },
}

impl RideError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        RideError::Validation { code, message: message.into() }
    }

    pub fn concurrency(code: &'static str, message: impl Into<String>, ride_id: RideId) -> Self {
        RideError::Concurrency { code, message: message.into(), ride_id: Some(ride_id) }
    }

    pub fn business(code: &'static str, message: impl Into<String>) -> Self {
        RideError::Business { code, message: message.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        RideError::Transient { message: message.into() }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        RideError::Fatal { message: message.into() }
    }

    /// The stable `code` field of the outbound `rideError` wire event, for
    /// variants that carry one (Fatal/Transient never reach the wire as-is).
    pub fn wire_code(&self) -> Option<&'static str> {
        match self {
            RideError::Validation { code, .. } => Some(code),
            RideError::Concurrency { code, .. } => Some(code),
            RideError::Business { code, .. } => Some(code),
            RideError::Transient { .. } | RideError::Fatal { .. } => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RideError::Transient { .. })
    }
}

// The wire's literal error codes, as associated constants so call sites can't typo them.
pub mod codes {
    pub const DUPLICATE_RIDE_ATTEMPT: &str = "DUPLICATE_RIDE_ATTEMPT";
    pub const RIDE_ALREADY_ACCEPTED: &str = "RIDE_ALREADY_ACCEPTED";
    pub const NO_DRIVERS_FOUND: &str = "NO_DRIVERS_FOUND";
    pub const NO_DRIVER_ACCEPTED_TIMEOUT: &str = "NO_DRIVER_ACCEPTED_TIMEOUT";
    pub const RIDE_CREATION_FAILED: &str = "RIDE_CREATION_FAILED";
    pub const RIDE_ACCEPTANCE_FAILED: &str = "RIDE_ACCEPTANCE_FAILED";
    pub const PAYMENT_NOT_VERIFIED: &str = "PAYMENT_NOT_VERIFIED";
    pub const PAYMENT_AMOUNT_MISMATCH: &str = "PAYMENT_AMOUNT_MISMATCH";
    pub const PAYMENT_AMOUNT_INVALID: &str = "PAYMENT_AMOUNT_INVALID";
    pub const PAYMENT_VERIFICATION_FAILED: &str = "PAYMENT_VERIFICATION_FAILED";
}
