//! Rider identity + wallet.

use crate::ids::UserId;
use crate::Money;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub socket_id: Option<String>,
    pub wallet_balance: Money,
    pub referral_code: Option<String>,
    pub referred_by: Option<String>,
}

impl User {
    pub fn new(id: UserId) -> Self {
        User {
            id,
            socket_id: None,
            wallet_balance: Money::ZERO,
            referral_code: None,
            referred_by: None,
        }
    }
}
