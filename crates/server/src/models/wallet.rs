//! Wallet balances and ledger entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carpool_core::{Money, RideId, TransactionId, TransactionKind, UserId};

/// Per-user balance, stored under `wallets:{user_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Money,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// An empty wallet.
    #[must_use]
    pub const fn empty(user_id: UserId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            balance: Money::ZERO,
            updated_at: at,
        }
    }
}

/// Append-only ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub user_id: UserId,
    /// `incoming`, `outgoing` or `add`.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Always positive; the direction comes from `kind`.
    pub amount: Money,
    pub description: String,
    /// Ride that caused the entry, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ride_id: Option<RideId>,
    pub date: DateTime<Utc>,
}
