pub mod gateway_webhook;
pub mod otp;

pub use gateway_webhook::verify_webhook_signature;
pub use otp::{mint_otp, mint_ride_otps, verify_otp};
