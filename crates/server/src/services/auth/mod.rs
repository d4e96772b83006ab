//! Authentication service.
//!
//! Password registration and login, plus opaque bearer sessions. Only the
//! SHA-256 of a session token is stored, so a leaked store cannot be replayed.

mod error;

pub use error::AuthError;

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{TimeDelta, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::instrument;

use carpool_core::{Email, Role, UserId};

use crate::models::{CurrentUser, SessionRecord, User, UserRecord};
use crate::services::wallet::WalletService;
use crate::store::{Collection, DocumentStore};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Random bytes in a session token.
const TOKEN_BYTES: usize = 32;

/// Validated registration input.
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub role: Role,
    pub vehicle_model: Option<String>,
    pub vehicle_plate: Option<String>,
    pub license_number: Option<String>,
}

/// Authentication service.
///
/// Handles user registration, login, and session resolution.
#[derive(Debug, Clone)]
pub struct AuthService {
    users: Collection<UserRecord>,
    emails: Collection<UserId>,
    sessions: Collection<SessionRecord>,
    wallets: WalletService,
    session_ttl: TimeDelta,
}

impl AuthService {
    /// Create a new authentication service.
    #[must_use]
    pub fn new(store: &Arc<dyn DocumentStore>, session_ttl: TimeDelta) -> Self {
        Self {
            users: Collection::new(Arc::clone(store), "users"),
            emails: Collection::new(Arc::clone(store), "user_emails"),
            sessions: Collection::new(Arc::clone(store), "sessions"),
            wallets: WalletService::new(store),
            session_ttl,
        }
    }

    /// Register a new user and open an empty wallet for them.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all, fields(role = %registration.role))]
    pub async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let email = Email::parse(&registration.email)?;
        validate_password(&registration.password)?;
        let password_hash = hash_password(&registration.password)?;

        let is_driver = registration.role == Role::Driver;
        let driver_only = |field: Option<String>| field.filter(|_| is_driver);

        let user = User {
            id: UserId::generate(),
            name: registration.name,
            email,
            phone: registration.phone,
            role: registration.role,
            vehicle_model: driver_only(registration.vehicle_model),
            vehicle_plate: driver_only(registration.vehicle_plate),
            license_number: driver_only(registration.license_number),
            created_at: Utc::now(),
        };

        // Claiming the email key first makes uniqueness a single atomic step.
        self.emails
            .insert(&user.email, &user.id)
            .await
            .map_err(|e| {
                if e.is_revision_mismatch() {
                    AuthError::UserAlreadyExists
                } else {
                    AuthError::Repository(e)
                }
            })?;

        let record = UserRecord {
            user: user.clone(),
            password_hash,
        };
        if let Err(e) = self.users.insert(user.id, &record).await {
            if let Err(cleanup) = self.emails.remove(&user.email).await {
                tracing::error!(email = %user.email, error = %cleanup, "failed to release email after aborted registration");
            }
            return Err(e.into());
        }

        self.wallets.open(user.id).await?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Login with email and password, returning the user and a fresh bearer token.
    ///
    /// If `role` is given it must match the account's role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email, password or role is wrong.
    #[instrument(skip_all)]
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        role: Option<Role>,
    ) -> Result<(User, String), AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let user_id = self
            .emails
            .get(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;
        let record = self
            .users
            .get(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &record.password_hash)?;

        if role.is_some_and(|r| r != record.user.role) {
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.create_session(record.user.id).await?;
        tracing::info!(user_id = %record.user.id, "user logged in");
        Ok((record.user, token))
    }

    /// Resolve a bearer token to the user it belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidSession` for unknown or expired tokens.
    pub async fn authenticate(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let key = session_key(token);
        let session = self
            .sessions
            .get(&key)
            .await?
            .ok_or(AuthError::InvalidSession)?;

        if session.is_expired(Utc::now()) {
            self.sessions.remove(&key).await?;
            return Err(AuthError::InvalidSession);
        }

        let user = self
            .users
            .get(session.user_id)
            .await?
            .ok_or(AuthError::InvalidSession)?
            .user;

        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        })
    }

    /// Revoke a bearer token. Returns `false` if it was not active.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the store fails.
    pub async fn logout(&self, token: &str) -> Result<bool, AuthError> {
        Ok(self.sessions.remove(session_key(token)).await?)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get(user_id)
            .await?
            .map(|record| record.user)
            .ok_or(AuthError::UserNotFound)
    }

    async fn create_session(&self, user_id: UserId) -> Result<String, AuthError> {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);

        let now = Utc::now();
        let record = SessionRecord {
            user_id,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.sessions.insert(session_key(&token), &record).await?;

        Ok(token)
    }
}

/// Storage key for a token: hex SHA-256, so raw tokens never hit the store.
fn session_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
