//! Opaque newtype identifiers.
//!
//! Every cross-entity reference in this workspace goes through one of these
//! ids, never a raw `String`/`u64` and never a direct pointer — Rides,
//! Drivers, and Users each live in their own store keyed by their id (see
//! `ride-store`), and `notifiedDrivers`/`rejectedDrivers`/`driverId` are
//! always ids, looked up fresh on every access.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), &self.0.to_string()[..8])
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

opaque_id!(RideId);
opaque_id!(DriverId);
opaque_id!(UserId);
opaque_id!(PayoutId);

/// Rated-entity / messaging-boundary polymorphism: an explicit tagged
/// variant for "rider or driver", matched exhaustively at every boundary
/// rather than carried as a discriminator string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Participant {
    Rider(UserId),
    Driver(DriverId),
}
