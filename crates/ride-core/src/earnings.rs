//! `AdminEarnings`, `Payout`, and `WalletTransaction`.

use crate::booking::PaymentStatus;
use crate::ids::{DriverId, PayoutId, RideId, UserId};
use crate::Money;
use crate::Timestamp;
use serde::{Deserialize, Serialize};

/// One record per completed ride, unique on `ride_id` (E2).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AdminEarnings {
    pub ride_id: RideId,
    pub driver_id: DriverId,
    pub rider_id: UserId,
    pub gross_fare: Money,
    pub platform_fee: Money,
    pub driver_earning: Money,
    pub ride_date: Timestamp,
    pub payment_status: PaymentStatus,
}

impl AdminEarnings {
    /// E1: gross == platformFee + driverEarning within 0.01 (one cent).
    pub fn satisfies_split_invariant(&self) -> bool {
        self.gross_fare.within_tolerance(self.platform_fee + self.driver_earning, 1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Payout {
    pub id: PayoutId,
    pub driver_id: DriverId,
    pub amount: Money,
    pub status: PayoutStatus,
    pub related_earnings: Vec<RideId>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletTransactionType {
    TopUp,
    RidePayment,
    Refund,
    Bonus,
    ReferralReward,
    Withdrawal,
    AdminAdjustment,
    CancellationFee,
}

impl WalletTransactionType {
    /// Whether this transaction type credits (adds to) or debits (subtracts
    /// from) the wallet balance, per W1.
    pub fn is_credit(self) -> bool {
        matches!(
            self,
            WalletTransactionType::TopUp
                | WalletTransactionType::Refund
                | WalletTransactionType::Bonus
                | WalletTransactionType::ReferralReward
                | WalletTransactionType::AdminAdjustment
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalletTransactionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub user_id: UserId,
    pub tx_type: WalletTransactionType,
    pub amount: Money,
    pub balance_before: Money,
    pub balance_after: Money,
    pub status: WalletTransactionStatus,
    /// Present for `RidePayment`/`Refund` rows created by the finalizer;
    /// used to enforce W3 (at most one hybrid `RidePayment` per ride).
    pub ride_id: Option<RideId>,
    pub hybrid_payment: bool,
}

impl WalletTransaction {
    /// W1: `balance_after = balance_before +/- amount` consistent with the
    /// credit/debit sign of `tx_type`.
    pub fn satisfies_balance_invariant(&self) -> bool {
        let expected = if self.tx_type.is_credit() {
            self.balance_before + self.amount
        } else {
            self.balance_before - self.amount
        };
        expected == self.balance_after
    }
}
