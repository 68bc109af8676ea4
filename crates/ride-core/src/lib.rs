//! Domain types shared by every crate in the ride-dispatch workspace:
//! opaque ids, fixed-point money, the `Ride`/`Driver`/`User` entities and
//! their state machine, the error taxonomy, and the wire event shapes.
//!
//! Nothing in this crate touches a store, a lock, or the network — it is
//! the pure domain layer every other crate builds on.

pub mod booking;
pub mod constants;
pub mod driver;
pub mod earnings;
pub mod error;
pub mod events;
pub mod ids;
pub mod money;
pub mod ride;
pub mod user;
pub mod settings;

pub use booking::{BookingType, CancelledBy, PaymentMethod, PaymentStatus};
pub use driver::{Driver, VehicleInfo};
pub use earnings::{AdminEarnings, Payout, PayoutStatus, WalletTransaction, WalletTransactionStatus, WalletTransactionType};
pub use error::RideError;
pub use events::OutboundEvent;
pub use ids::{DriverId, Participant, PayoutId, RideId, UserId};
pub use money::Money;
pub use ride::{Location, Otp, Ride, RideAction, RideStatus};
pub use settings::Settings;
pub use user::User;

/// Unix seconds, UTC. Produced via `chrono::Utc::now().timestamp()` at every
/// write site (never inside a pure function like `Ride::apply`).
pub type Timestamp = i64;

pub fn now() -> Timestamp {
    chrono::Utc::now().timestamp()
}
