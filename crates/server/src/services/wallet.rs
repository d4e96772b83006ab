//! Wallet ledger.
//!
//! Balance changes are compare-and-set updates of `wallets:{user_id}`; a
//! debit re-checks the balance on every retry, so concurrent debits can never
//! overdraw. Each successful change then appends one `transactions:{id}` entry.
//!
//! The append happens after the balance write. If it fails the balance has
//! already moved and the error is returned to the caller.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use carpool_core::{Money, RideId, TransactionId, TransactionKind, UserId};

use crate::models::{Transaction, Wallet};
use crate::store::{Collection, DocumentStore, RepositoryError};

/// Ledger description for a driver's fare.
pub const RIDE_INCOME: &str = "Ride income";
/// Ledger description for a passenger's payment.
pub const RIDE_PAYMENT: &str = "Ride payment";
/// Ledger description for a top-up.
pub const TOP_UP: &str = "Wallet top-up";
/// Ledger description for a withdrawal.
pub const WITHDRAWAL: &str = "Withdrawal";

/// Errors from wallet operations.
#[derive(Debug, Error)]
pub enum WalletError {
    /// Zero, negative, or more than two decimal places.
    #[error("amount must be positive with at most two decimal places")]
    InvalidAmount,

    /// Debit larger than the balance.
    #[error("insufficient balance")]
    InsufficientBalance {
        /// Balance at the time of the attempt.
        balance: Money,
        /// Amount requested.
        requested: Money,
    },

    /// Arithmetic overflow.
    #[error("balance overflow")]
    Overflow,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Balance plus history, newest entry first.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statement {
    pub balance: Money,
    pub transactions: Vec<Transaction>,
}

/// Wallet service.
#[derive(Debug, Clone)]
pub struct WalletService {
    wallets: Collection<Wallet>,
    transactions: Collection<Transaction>,
}

impl WalletService {
    /// Create a wallet service over `store`.
    #[must_use]
    pub fn new(store: &Arc<dyn DocumentStore>) -> Self {
        Self {
            wallets: Collection::new(Arc::clone(store), "wallets"),
            transactions: Collection::new(Arc::clone(store), "transactions"),
        }
    }

    /// Create an empty wallet for `user_id`, or return the existing one.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Repository` if the store fails.
    pub async fn open(&self, user_id: UserId) -> Result<Wallet, WalletError> {
        let now = Utc::now();
        self.wallets
            .modify(user_id, |current| {
                Ok::<_, WalletError>(current.unwrap_or_else(|| Wallet::empty(user_id, now)))
            })
            .await
    }

    /// Current balance; zero if the user has no wallet yet.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Repository` if the store fails.
    pub async fn balance(&self, user_id: UserId) -> Result<Money, WalletError> {
        Ok(self
            .wallets
            .get(user_id)
            .await?
            .map_or(Money::ZERO, |w| w.balance))
    }

    /// Add money earned by `user_id` (`incoming`).
    ///
    /// # Errors
    ///
    /// Returns `WalletError::InvalidAmount` for non-positive amounts.
    pub async fn credit(
        &self,
        user_id: UserId,
        amount: Money,
        description: &str,
        ride_id: Option<RideId>,
    ) -> Result<Money, WalletError> {
        self.apply(user_id, TransactionKind::Incoming, amount, description, ride_id)
            .await
    }

    /// Take money from `user_id` (`outgoing`).
    ///
    /// # Errors
    ///
    /// Returns `WalletError::InsufficientBalance` if the balance is too low;
    /// the balance is left unchanged.
    pub async fn debit(
        &self,
        user_id: UserId,
        amount: Money,
        description: &str,
        ride_id: Option<RideId>,
    ) -> Result<Money, WalletError> {
        self.apply(user_id, TransactionKind::Outgoing, amount, description, ride_id)
            .await
    }

    /// Owner-initiated top-up (`add`).
    ///
    /// # Errors
    ///
    /// Returns `WalletError::InvalidAmount` for non-positive amounts.
    pub async fn top_up(&self, user_id: UserId, amount: Money) -> Result<Money, WalletError> {
        self.apply(user_id, TransactionKind::Add, amount, TOP_UP, None)
            .await
    }

    /// Owner-initiated withdrawal (`outgoing`).
    ///
    /// # Errors
    ///
    /// Returns `WalletError::InsufficientBalance` if the balance is too low.
    pub async fn withdraw(&self, user_id: UserId, amount: Money) -> Result<Money, WalletError> {
        self.apply(user_id, TransactionKind::Outgoing, amount, WITHDRAWAL, None)
            .await
    }

    /// Balance and the user's ledger entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WalletError::Repository` if the store fails.
    pub async fn statement(&self, user_id: UserId) -> Result<Statement, WalletError> {
        let balance = self.balance(user_id).await?;
        let mut transactions: Vec<Transaction> = self
            .transactions
            .all()
            .await?
            .into_iter()
            .filter(|tx| tx.user_id == user_id)
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date));

        Ok(Statement {
            balance,
            transactions,
        })
    }

    #[instrument(skip_all, fields(user_id = %user_id, kind = %kind, amount = %amount))]
    async fn apply(
        &self,
        user_id: UserId,
        kind: TransactionKind,
        amount: Money,
        description: &str,
        ride_id: Option<RideId>,
    ) -> Result<Money, WalletError> {
        if !amount.is_positive() || !amount.has_valid_scale() {
            return Err(WalletError::InvalidAmount);
        }

        let now = Utc::now();
        let wallet = self
            .wallets
            .modify(user_id, |current: Option<Wallet>| -> Result<Wallet, WalletError> {
                let mut wallet = current.unwrap_or_else(|| Wallet::empty(user_id, now));
                wallet.balance = match kind {
                    TransactionKind::Incoming | TransactionKind::Add => wallet
                        .balance
                        .checked_add(amount)
                        .ok_or(WalletError::Overflow)?,
                    TransactionKind::Outgoing => {
                        if wallet.balance < amount {
                            return Err(WalletError::InsufficientBalance {
                                balance: wallet.balance,
                                requested: amount,
                            });
                        }
                        wallet
                            .balance
                            .checked_sub(amount)
                            .ok_or(WalletError::Overflow)?
                    }
                };
                wallet.updated_at = now;
                Ok(wallet)
            })
            .await?;

        let entry = Transaction {
            id: TransactionId::generate(),
            user_id,
            kind,
            amount,
            description: description.to_owned(),
            ride_id,
            date: now,
        };
        self.transactions.insert(entry.id, &entry).await?;

        tracing::info!(balance = %wallet.balance, "wallet updated");
        Ok(wallet.balance)
    }
}
