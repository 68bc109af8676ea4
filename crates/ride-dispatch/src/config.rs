use ride_core::constants;

#[derive(Clone, Debug)]
pub struct DispatchConfig {
    pub radii_km: Vec<f64>,
    pub retry_radii_km: Vec<f64>,
    pub max_candidates: usize,
    pub worker_pool_size: usize,
    pub enqueue_retry_attempts: u32,
    pub enqueue_retry_base_secs: u64,
    pub enqueue_retry_factor: u64,
    pub sweeper_timeout_minutes: i64,
    pub sweeper_check_interval_minutes: i64,
    pub sweeper_batch_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            radii_km: constants::DEFAULT_DISPATCH_RADII_KM.to_vec(),
            retry_radii_km: constants::DEFAULT_DISPATCH_RETRY_RADII_KM.to_vec(),
            max_candidates: constants::DEFAULT_DISPATCH_MAX_CANDIDATES,
            worker_pool_size: constants::DEFAULT_DISPATCH_WORKER_CONCURRENCY,
            enqueue_retry_attempts: constants::DISPATCH_MAX_RETRY_ATTEMPTS,
            enqueue_retry_base_secs: constants::DISPATCH_RETRY_BASE_SECS,
            enqueue_retry_factor: constants::DISPATCH_RETRY_FACTOR,
            sweeper_timeout_minutes: constants::DEFAULT_RIDE_AUTO_CANCEL_TIMEOUT_MINUTES,
            sweeper_check_interval_minutes: constants::DEFAULT_RIDE_AUTO_CANCEL_CHECK_INTERVAL_MINUTES,
            sweeper_batch_size: constants::DEFAULT_SWEEPER_BATCH_SIZE,
        }
    }
}
