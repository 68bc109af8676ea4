//! Driver presence + capability record.

use crate::ids::DriverId;
use crate::ride::Location;
use crate::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VehicleInfo {
    pub make: String,
    pub model: String,
    pub plate: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Driver {
    pub id: DriverId,
    pub location: Location,
    pub is_online: bool,
    pub is_active: bool,
    pub is_busy: bool,
    pub busy_until: Option<Timestamp>,
    pub socket_id: Option<String>,
    pub last_seen: Timestamp,
    pub rating: f64,
    pub vehicle_info: VehicleInfo,
    pub bank_account: Option<String>,
}

impl Driver {
    pub fn new(id: DriverId, location: Location, vehicle_info: VehicleInfo, now: Timestamp) -> Self {
        Driver {
            id,
            location,
            is_online: false,
            is_active: false,
            is_busy: false,
            busy_until: None,
            socket_id: None,
            last_seen: now,
            rating: 5.0,
            vehicle_info,
            bank_account: None,
        }
    }

    /// D2: a driver with no socket id is never dispatch-eligible, even if
    /// `is_online`.
    pub fn is_dispatch_eligible(&self) -> bool {
        self.is_online && self.is_active && !self.is_busy && self.socket_id.is_some()
    }

    pub fn hard_reset_on_disconnect(&mut self) {
        self.is_online = false;
        self.is_busy = false;
        self.busy_until = None;
        self.socket_id = None;
    }
}
