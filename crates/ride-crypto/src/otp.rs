//! OTP minting and verification (`spec.md` §4.2, I5).
//!
//! Both OTPs are drawn independently from a cryptographically strong
//! uniform source at Ride creation and are never emitted on socket events to
//! the opposing party. Verification is constant-time so a timing side
//! channel can't leak how many leading digits matched.

use rand::rngs::OsRng;
use rand::RngCore;
use ride_core::Otp;
use subtle::ConstantTimeEq;

/// Draws a 4-digit decimal OTP (`"0000"`..=`"9999"`, leading zeros kept) from
/// the OS CSPRNG.
pub fn mint_otp() -> Otp {
    let mut rng = OsRng;
    let value = rng.next_u32() % 10_000;
    Otp(format!("{value:04}"))
}

pub fn mint_ride_otps() -> (Otp, Otp) {
    (mint_otp(), mint_otp())
}

/// Constant-time comparison — rejects on even a one-character mismatch,
/// including a leading-zero difference (`"0471"` != `"471"` at the type
/// boundary, but we also guard length explicitly since `ct_eq` over slices
/// of different lengths is a logic bug, not just a timing one).
pub fn verify_otp(candidate: &str, expected: &Otp) -> bool {
    let expected_bytes = expected.as_str().as_bytes();
    let candidate_bytes = candidate.as_bytes();
    if expected_bytes.len() != candidate_bytes.len() {
        return false;
    }
    candidate_bytes.ct_eq(expected_bytes).into()
}
