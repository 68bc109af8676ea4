//! Schema'd booking metadata: a tagged variant keyed by booking type rather
//! than a free-form metadata object, so a `Rental` ride simply cannot be
//! missing `days` at compile time.

use crate::Timestamp;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BookingType {
    Instant,
    FullDay { start_time: Timestamp, end_time: Timestamp },
    Rental { days: u32 },
    DateWise { dates: Vec<Timestamp> },
}

impl BookingType {
    pub fn label(&self) -> &'static str {
        match self {
            BookingType::Instant => "INSTANT",
            BookingType::FullDay { .. } => "FULL_DAY",
            BookingType::Rental { .. } => "RENTAL",
            BookingType::DateWise { .. } => "DATE_WISE",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Gateway,
    Wallet,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
    Partial,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelledBy {
    Rider,
    Driver,
    System,
}
