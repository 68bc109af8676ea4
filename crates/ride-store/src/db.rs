//! `RideStore`: the durable-store trait (`spec.md` §3's entity stores) plus
//! `MemRideStore`, an in-process implementation backed by `DashMap`s — one
//! map per entity, mirroring the teacher's one-table-per-entity layout. A
//! production deployment swaps this for an embedded/external database
//! behind the same trait without touching any domain crate.

use dashmap::DashMap;
use ride_core::{AdminEarnings, Driver, DriverId, RideError, RideId, Settings, User, UserId, WalletTransaction};
use ride_core::ride::Ride;
use tracing::error;

pub trait RideStore: Send + Sync {
    fn get_ride(&self, id: RideId) -> Option<Ride>;
    fn put_ride(&self, ride: Ride);
    /// Rides with `status=requested` and `created_at < older_than`, oldest
    /// first, capped at `limit` (the Sweeper's bounded batch per tick).
    fn requested_rides_older_than(&self, older_than: ride_core::Timestamp, limit: usize) -> Vec<Ride>;
    /// Every non-terminal ride referencing `user_id` or `driver_id` (used by
    /// `ride-events` reconnection rejoin).
    fn active_rides_for_user(&self, user_id: UserId) -> Vec<Ride>;
    fn active_rides_for_driver(&self, driver_id: DriverId) -> Vec<Ride>;

    fn get_driver(&self, id: DriverId) -> Option<Driver>;
    fn put_driver(&self, driver: Driver);
    /// Every known driver, for the Matcher's candidate gathering pass
    /// (narrowed to dispatch-eligible ones by the caller). A production
    /// deployment would back this with a geo-indexed query instead of a
    /// full scan; the eligibility/ordering logic in `ride-geo` is unchanged
    /// either way.
    fn all_drivers(&self) -> Vec<Driver>;

    fn get_user(&self, id: UserId) -> Option<User>;
    fn put_user(&self, user: User);

    fn get_settings(&self) -> Settings;
    fn put_settings(&self, settings: Settings);
    /// Whether `put_settings` has ever been called — distinguishes a
    /// genuinely bootstrapped record from `get_settings`'s zero-value
    /// fallback (used by `ride-genesis` to decide whether this is first
    /// boot).
    fn has_settings(&self) -> bool;

    /// Upsert keyed by `ride_id` (E2). Returns whether a row already
    /// existed (used by the Finalizer to decide whether this is the first
    /// write or an idempotent repeat).
    fn upsert_admin_earnings(&self, earnings: AdminEarnings) -> bool;
    fn get_admin_earnings(&self, ride_id: RideId) -> Option<AdminEarnings>;

    fn append_wallet_transaction(&self, tx: WalletTransaction) -> Result<(), RideError>;
    /// W3: existing hybrid `RidePayment` rows for this ride, to detect a
    /// double debit before appending another.
    fn wallet_transactions_for_ride(&self, ride_id: RideId) -> Vec<WalletTransaction>;
}

#[derive(Default)]
pub struct MemRideStore {
    rides: DashMap<RideId, Ride>,
    drivers: DashMap<DriverId, Driver>,
    users: DashMap<UserId, User>,
    settings: parking_lot::RwLock<Option<Settings>>,
    admin_earnings: DashMap<RideId, AdminEarnings>,
    wallet_transactions: DashMap<UserId, Vec<WalletTransaction>>,
}

impl MemRideStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: Settings) -> Self {
        let store = Self::new();
        store.put_settings(settings);
        store
    }
}

impl RideStore for MemRideStore {
    fn get_ride(&self, id: RideId) -> Option<Ride> {
        self.rides.get(&id).map(|r| r.clone())
    }

    fn put_ride(&self, ride: Ride) {
        self.rides.insert(ride.id, ride);
    }

    fn requested_rides_older_than(&self, older_than: ride_core::Timestamp, limit: usize) -> Vec<Ride> {
        let mut matching: Vec<Ride> = self
            .rides
            .iter()
            .map(|r| r.clone())
            .filter(|r| r.status == ride_core::RideStatus::Requested && r.created_at < older_than)
            .collect();
        matching.sort_by_key(|r| r.created_at);
        matching.truncate(limit);
        matching
    }

    fn active_rides_for_user(&self, user_id: UserId) -> Vec<Ride> {
        self.rides
            .iter()
            .map(|r| r.clone())
            .filter(|r| r.rider_id == user_id && r.status.is_active())
            .collect()
    }

    fn active_rides_for_driver(&self, driver_id: DriverId) -> Vec<Ride> {
        self.rides
            .iter()
            .map(|r| r.clone())
            .filter(|r| r.driver_id == Some(driver_id) && r.status.is_active())
            .collect()
    }

    fn get_driver(&self, id: DriverId) -> Option<Driver> {
        self.drivers.get(&id).map(|d| d.clone())
    }

    fn put_driver(&self, driver: Driver) {
        self.drivers.insert(driver.id, driver);
    }

    fn all_drivers(&self) -> Vec<Driver> {
        self.drivers.iter().map(|d| d.clone()).collect()
    }

    fn get_user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    fn put_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    fn get_settings(&self) -> Settings {
        self.settings.read().clone().unwrap_or_default()
    }

    fn put_settings(&self, settings: Settings) {
        *self.settings.write() = Some(settings);
    }

    fn has_settings(&self) -> bool {
        self.settings.read().is_some()
    }

    fn upsert_admin_earnings(&self, earnings: AdminEarnings) -> bool {
        self.admin_earnings.insert(earnings.ride_id, earnings).is_some()
    }

    fn get_admin_earnings(&self, ride_id: RideId) -> Option<AdminEarnings> {
        self.admin_earnings.get(&ride_id).map(|e| e.clone())
    }

    fn append_wallet_transaction(&self, tx: WalletTransaction) -> Result<(), RideError> {
        if !tx.satisfies_balance_invariant() {
            error!(user_id = %tx.user_id, "wallet transaction balance invariant violated, refusing to append");
            return Err(RideError::fatal(format!(
                "wallet transaction balance invariant violated for user {}",
                tx.user_id
            )));
        }
        self.wallet_transactions.entry(tx.user_id).or_default().push(tx);
        Ok(())
    }

    fn wallet_transactions_for_ride(&self, ride_id: RideId) -> Vec<WalletTransaction> {
        self.wallet_transactions
            .iter()
            .flat_map(|entry| entry.value().clone())
            .filter(|tx| tx.ride_id == Some(ride_id))
            .collect()
    }
}
