//! One-time `Settings` singleton bootstrap (`spec.md` §3). Runs once at
//! `ride-node` startup, before the dispatch pipeline or sweeper is spawned,
//! so every read of `Settings` downstream observes a validated record.

use ride_core::{RideError, Settings};
use ride_store::RideStore;
use std::sync::Arc;
use tracing::info;

/// Writes `settings` if the store has none yet (first boot), otherwise
/// leaves the existing record untouched — `Settings` writes are an
/// out-of-scope admin operation, never something the dispatch core
/// overwrites on every restart.
pub fn bootstrap(store: &Arc<dyn RideStore>, settings: Settings) -> Result<Settings, RideError> {
    settings.validate()?;

    if !store.has_settings() {
        info!(
            platform_fee_pct = settings.platform_fee_pct,
            driver_commission_pct = settings.driver_commission_pct,
            "bootstrapping Settings singleton"
        );
        store.put_settings(settings.clone());
        return Ok(settings);
    }

    let existing = store.get_settings();
    existing.validate()?;
    Ok(existing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ride_store::MemRideStore;

    #[test]
    fn first_boot_writes_the_provided_settings() {
        let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
        let settings = Settings { platform_fee_pct: 25.0, ..Settings::default() };
        let result = bootstrap(&store, settings.clone()).unwrap();
        assert_eq!(result.platform_fee_pct, 25.0);
        assert_eq!(store.get_settings().platform_fee_pct, 25.0);
    }

    #[test]
    fn second_boot_does_not_overwrite_existing_settings() {
        let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
        bootstrap(&store, Settings { platform_fee_pct: 25.0, ..Settings::default() }).unwrap();
        let result = bootstrap(&store, Settings { platform_fee_pct: 99.0, ..Settings::default() }).unwrap();
        assert_eq!(result.platform_fee_pct, 25.0);
    }

    #[test]
    fn invalid_percentages_are_rejected() {
        let store: Arc<dyn RideStore> = Arc::new(MemRideStore::new());
        let err = bootstrap(&store, Settings { platform_fee_pct: 150.0, ..Settings::default() }).unwrap_err();
        assert!(matches!(err, RideError::Fatal { .. }));
    }
}
