//! Connection bookkeeping: one id per live socket, regardless of which
//! identity (rider/driver/admin) it authenticated as.

use ride_core::Participant;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identity a connection authenticated as, set on `riderConnect` /
/// `driverConnect` and consulted by the authorization check in §4.8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionIdentity {
    Rider(ride_core::UserId),
    Driver(ride_core::DriverId),
    Admin,
}

impl From<ConnectionIdentity> for Option<Participant> {
    fn from(identity: ConnectionIdentity) -> Self {
        match identity {
            ConnectionIdentity::Rider(id) => Some(Participant::Rider(id)),
            ConnectionIdentity::Driver(id) => Some(Participant::Driver(id)),
            ConnectionIdentity::Admin => None,
        }
    }
}
