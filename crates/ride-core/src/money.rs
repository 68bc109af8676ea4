//! Fixed-point money in integer minor units (hundredths of the display
//! currency), so fare/fee/earning splits are checked with integer equality
//! instead of floating-point tolerance comparisons.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_major(major: f64) -> Self {
        Money((major * 100.0).round() as i64)
    }

    pub fn major(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// `fare * pct / 100`, rounded to the nearest cent.
    pub fn percent_of(self, pct: f64) -> Money {
        Money(((self.0 as f64) * pct / 100.0).round() as i64)
    }

    /// `|a - b| <= tolerance_cents` — used for E1's ≤0.01 tolerance check.
    pub fn within_tolerance(self, other: Money, tolerance_cents: i64) -> bool {
        (self.0 - other.0).abs() <= tolerance_cents
    }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.major())
    }
}

impl fmt::Debug for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Money({:.2})", self.major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_split_sums_to_whole_within_tolerance() {
        let fare = Money::from_major(250.0);
        let platform_fee = fare.percent_of(20.0);
        let driver_earning = fare.percent_of(80.0);
        assert!(fare.within_tolerance(platform_fee + driver_earning, 1));
    }

    #[test]
    fn major_round_trips_through_cents() {
        let m = Money::from_major(12.34);
        assert_eq!(m.0, 1234);
        assert_eq!(m.major(), 12.34);
    }
}
