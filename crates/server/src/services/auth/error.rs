//! Authentication error types.

use thiserror::Error;

use carpool_core::{EmailError, UnknownVariant};

use crate::services::wallet::WalletError;
use crate::store::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A registration field was absent or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Role is neither `driver` nor `passenger`.
    #[error("{0}")]
    InvalidRole(#[from] UnknownVariant),

    /// Invalid credentials (wrong password, unknown email or role mismatch).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Bearer token unknown or expired.
    #[error("invalid or expired session")]
    InvalidSession,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Opening the new user's wallet failed.
    #[error("wallet error: {0}")]
    Wallet(#[from] WalletError),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
