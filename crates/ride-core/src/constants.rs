//! Configuration defaults from `spec.md` §6. `ride-node`'s clap layer reads
//! these as fallbacks when the corresponding environment variable is unset.

pub const DEFAULT_RIDE_AUTO_CANCEL_TIMEOUT_MINUTES: i64 = 5;
pub const DEFAULT_RIDE_AUTO_CANCEL_CHECK_INTERVAL_MINUTES: i64 = 2;
pub const DEFAULT_DISPATCH_RADII_KM: &[f64] = &[3.0, 6.0, 9.0, 12.0, 15.0, 20.0];
pub const DEFAULT_DISPATCH_RETRY_RADII_KM: &[f64] = &[15.0, 20.0, 25.0];
pub const DEFAULT_DISPATCH_MAX_CANDIDATES: usize = 20;
pub const DEFAULT_ACCEPT_LOCK_TTL_SEC: u64 = 15;
pub const DEFAULT_WORKER_LOCK_TTL_SEC: u64 = 30;
pub const DEFAULT_DRIVER_PRESENCE_TTL_SEC: u64 = 60;
pub const DEFAULT_DISPATCH_WORKER_CONCURRENCY: usize = 5;
pub const DEFAULT_SWEEPER_BATCH_SIZE: usize = 100;
pub const DISPATCH_MAX_RETRY_ATTEMPTS: u32 = 3;
pub const DISPATCH_RETRY_BASE_SECS: u64 = 5;
pub const DISPATCH_RETRY_FACTOR: u64 = 2;
pub const FINALIZE_RETRY_BACKOFFS_SECS: &[u64] = &[1, 2, 3];
pub const GATEWAY_VERIFY_TIMEOUT_SECS: u64 = 10;
pub const CONNECTION_PING_INTERVAL_SECS: u64 = 25;
pub const CONNECTION_PONG_TIMEOUT_SECS: u64 = 60;
