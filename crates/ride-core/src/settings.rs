//! Process-wide pricing/config singleton. Read-only from the dispatch core;
//! writes are an out-of-scope admin operation. Bootstrapped once by
//! `ride-genesis`.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settings {
    pub platform_fee_pct: f64,
    pub driver_commission_pct: f64,
    pub min_payout_threshold: crate::Money,
    pub dispatch_radii_km: Vec<f64>,
    pub dispatch_retry_radii_km: Vec<f64>,
}

impl Settings {
    /// Both percentages must land in `[0, 100]`.
    pub fn validate(&self) -> Result<(), crate::RideError> {
        if !(0.0..=100.0).contains(&self.platform_fee_pct)
            || !(0.0..=100.0).contains(&self.driver_commission_pct)
        {
            return Err(crate::RideError::fatal(
                "settings percentages out of [0,100] range",
            ));
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            platform_fee_pct: 20.0,
            driver_commission_pct: 80.0,
            min_payout_threshold: crate::Money::from_major(50.0),
            dispatch_radii_km: vec![3.0, 6.0, 9.0, 12.0, 15.0, 20.0],
            dispatch_retry_radii_km: vec![15.0, 20.0, 25.0],
        }
    }
}
