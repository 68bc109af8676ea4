//! The ambient configuration layer (`spec.md` §6): every dispatch tunable
//! is a `clap` flag with an environment-variable fallback, defaulting to
//! the literal values `spec.md` names. The two lock TTLs
//! (`ACCEPT_LOCK_TTL_SEC`, `WORKER_LOCK_TTL_SEC`) are deliberately not
//! exposed here — see `DESIGN.md` for why those stay compile-time
//! constants in `ride-arbiter` rather than runtime dials.

use clap::Parser;
use ride_core::constants;

fn parse_km_list(raw: &str) -> Result<Vec<f64>, String> {
    raw.split(',')
        .map(|s| s.trim().parse::<f64>().map_err(|e| e.to_string()))
        .collect()
}

#[derive(Parser, Clone, Debug)]
#[command(name = "ride-node", about = "The real-time ride-dispatch core")]
pub struct Config {
    /// §4.5: minutes a `requested` ride may wait before the sweeper cancels it.
    #[arg(long, env = "RIDE_AUTO_CANCEL_TIMEOUT_MINUTES", default_value_t = constants::DEFAULT_RIDE_AUTO_CANCEL_TIMEOUT_MINUTES)]
    pub ride_auto_cancel_timeout_minutes: i64,

    /// §4.5: how often the sweeper scans for stranded requests.
    #[arg(long, env = "RIDE_AUTO_CANCEL_CHECK_INTERVAL_MINUTES", default_value_t = constants::DEFAULT_RIDE_AUTO_CANCEL_CHECK_INTERVAL_MINUTES)]
    pub ride_auto_cancel_check_interval_minutes: i64,

    /// §4.1: progressive-radius schedule, km, comma-separated.
    #[arg(long, env = "DISPATCH_RADII_KM", value_parser = parse_km_list, default_value = "3,6,9,12,15,20")]
    pub dispatch_radii_km: Vec<f64>,

    /// §4.4: the wider schedule used once every notified driver has rejected.
    #[arg(long, env = "DISPATCH_RETRY_RADII_KM", value_parser = parse_km_list, default_value = "15,20,25")]
    pub dispatch_retry_radii_km: Vec<f64>,

    /// §4.1: candidates notified per dispatch round, at most.
    #[arg(long, env = "DISPATCH_MAX_CANDIDATES", default_value_t = constants::DEFAULT_DISPATCH_MAX_CANDIDATES)]
    pub dispatch_max_candidates: usize,

    /// §5: bounded worker-pool concurrency for the dispatch pipeline.
    #[arg(long, env = "DISPATCH_WORKER_CONCURRENCY", default_value_t = constants::DEFAULT_DISPATCH_WORKER_CONCURRENCY)]
    pub dispatch_worker_concurrency: usize,

    /// §4.5: stranded rides handled per sweeper tick, at most.
    #[arg(long, env = "SWEEPER_BATCH_SIZE", default_value_t = constants::DEFAULT_SWEEPER_BATCH_SIZE)]
    pub sweeper_batch_size: usize,

    /// §4.6: hot presence-cache TTL, seconds.
    #[arg(long, env = "DRIVER_PRESENCE_TTL_SEC", default_value_t = constants::DEFAULT_DRIVER_PRESENCE_TTL_SEC)]
    pub driver_presence_ttl_sec: u64,

    /// §3: platform's cut of the fare, percent.
    #[arg(long, env = "PLATFORM_FEE_PCT", default_value_t = 20.0)]
    pub platform_fee_pct: f64,

    /// §3: driver's cut of the fare, percent.
    #[arg(long, env = "DRIVER_COMMISSION_PCT", default_value_t = 80.0)]
    pub driver_commission_pct: f64,

    /// §3: minimum balance a driver must accrue before a payout is issued.
    #[arg(long, env = "MIN_PAYOUT_THRESHOLD", default_value_t = 50.0)]
    pub min_payout_threshold: f64,

    /// The jsonrpsee JSON-RPC 2.0 listen address.
    #[arg(long, env = "RPC_BIND_ADDR", default_value = "127.0.0.1:9944")]
    pub rpc_bind_addr: String,

    /// The raw-frame WebSocket gateway listen address (rider/driver clients).
    #[arg(long, env = "WS_BIND_ADDR", default_value = "127.0.0.1:9945")]
    pub ws_bind_addr: String,
}

impl Config {
    pub fn dispatch_config(&self) -> ride_dispatch::DispatchConfig {
        ride_dispatch::DispatchConfig {
            radii_km: self.dispatch_radii_km.clone(),
            retry_radii_km: self.dispatch_retry_radii_km.clone(),
            max_candidates: self.dispatch_max_candidates,
            worker_pool_size: self.dispatch_worker_concurrency,
            sweeper_timeout_minutes: self.ride_auto_cancel_timeout_minutes,
            sweeper_check_interval_minutes: self.ride_auto_cancel_check_interval_minutes,
            sweeper_batch_size: self.sweeper_batch_size,
            ..ride_dispatch::DispatchConfig::default()
        }
    }

    pub fn settings(&self) -> ride_core::Settings {
        ride_core::Settings {
            platform_fee_pct: self.platform_fee_pct,
            driver_commission_pct: self.driver_commission_pct,
            min_payout_threshold: ride_core::Money::from_major(self.min_payout_threshold),
            dispatch_radii_km: self.dispatch_radii_km.clone(),
            dispatch_retry_radii_km: self.dispatch_retry_radii_km.clone(),
        }
    }
}
