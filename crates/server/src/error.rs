//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. The response body is always
//! `{"error": "<message>"}`. Server faults are captured to Sentry and logged,
//! and the client only sees a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::services::{AuthError, CatalogError, DashboardError, RideError, WalletError};
use crate::store::RepositoryError;

/// Application-level error type for the carpool API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Document store operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Route error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Ride error: {0}")]
    Ride(#[from] RideError),

    #[error("Wallet error: {0}")]
    Wallet(#[from] WalletError),

    #[error("Dashboard error: {0}")]
    Dashboard(#[from] DashboardError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but may not do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The store error at the bottom of this error, if there is one.
    fn repository_error(&self) -> Option<&RepositoryError> {
        match self {
            Self::Database(e)
            | Self::Auth(AuthError::Repository(e) | AuthError::Wallet(WalletError::Repository(e)))
            | Self::Catalog(CatalogError::Repository(e))
            | Self::Ride(
                RideError::Repository(e)
                | RideError::Catalog(CatalogError::Repository(e))
                | RideError::Wallet(WalletError::Repository(e)),
            )
            | Self::Wallet(WalletError::Repository(e))
            | Self::Dashboard(
                DashboardError::Repository(e) | DashboardError::Catalog(CatalogError::Repository(e)),
            ) => Some(e),
            _ => None,
        }
    }

    /// HTTP status for this error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        if let Some(e) = self.repository_error() {
            return match e {
                RepositoryError::RevisionMismatch { .. } | RepositoryError::Contention { .. } => {
                    StatusCode::CONFLICT
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }

        match self {
            Self::Auth(err) => auth_status(err),
            Self::Catalog(err) | Self::Ride(RideError::Catalog(err)) => catalog_status(err),
            Self::Wallet(err) | Self::Ride(RideError::Wallet(err)) => wallet_status(err),
            Self::Ride(err) => ride_status(err),
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Dashboard(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to show the client.
    fn public_message(&self, status: StatusCode) -> String {
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            return "Internal server error".to_string();
        }
        if self.repository_error().is_some() {
            return "The record was changed by another request, please retry".to_string();
        }

        match self {
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            Self::Auth(AuthError::UserAlreadyExists) => {
                "An account with this email already exists".to_string()
            }
            Self::Auth(AuthError::WeakPassword(msg)) => msg.clone(),
            Self::Auth(err) => err.to_string(),
            Self::Catalog(err) => err.to_string(),
            Self::Ride(err) => err.to_string(),
            Self::Wallet(err) => err.to_string(),
            Self::Dashboard(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Database(err) => err.to_string(),
        }
    }
}

fn auth_status(err: &AuthError) -> StatusCode {
    match err {
        AuthError::MissingField(_)
        | AuthError::InvalidEmail(_)
        | AuthError::InvalidRole(_)
        | AuthError::WeakPassword(_)
        | AuthError::UserAlreadyExists => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials | AuthError::InvalidSession => StatusCode::UNAUTHORIZED,
        AuthError::UserNotFound => StatusCode::NOT_FOUND,
        AuthError::Wallet(err) => wallet_status(err),
        AuthError::Repository(_) | AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
        CatalogError::NotDriver => StatusCode::FORBIDDEN,
        CatalogError::RouteNotFound => StatusCode::NOT_FOUND,
        CatalogError::SeatsUnavailable => StatusCode::CONFLICT,
        CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn wallet_status(err: &WalletError) -> StatusCode {
    match err {
        WalletError::InvalidAmount
        | WalletError::InsufficientBalance { .. }
        | WalletError::Overflow => StatusCode::BAD_REQUEST,
        WalletError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn ride_status(err: &RideError) -> StatusCode {
    match err {
        RideError::Validation(_) | RideError::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
        RideError::RideNotFound => StatusCode::NOT_FOUND,
        RideError::NotPassenger
        | RideError::NotRideDriver
        | RideError::NotRidePassenger
        | RideError::NotParticipant => StatusCode::FORBIDDEN,
        RideError::InvalidTransition { .. }
        | RideError::DuplicateRequest
        | RideError::AlreadyPaid
        | RideError::NotPayable { .. }
        | RideError::NotRateable
        | RideError::AlreadyRated => StatusCode::CONFLICT,
        RideError::Catalog(err) => catalog_status(err),
        RideError::Wallet(err) => wallet_status(err),
        RideError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else if status == StatusCode::CONFLICT && self.repository_error().is_some() {
            tracing::warn!(error = %self, "Write conflict surfaced to client");
        }

        let message = self.public_message(status);
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use carpool_core::{Money, RideStatus};

    use super::*;

    async fn body(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("ride".to_string());
        assert_eq!(err.to_string(), "Not found: ride");

        let err = AppError::BadRequest("userId is required".to_string());
        assert_eq!(err.to_string(), "Bad request: userId is required");
    }

    #[test]
    fn test_app_error_status_codes() {
        let cases = [
            (AppError::Auth(AuthError::MissingField("phone")), StatusCode::BAD_REQUEST),
            (AppError::Auth(AuthError::UserAlreadyExists), StatusCode::BAD_REQUEST),
            (AppError::Auth(AuthError::InvalidCredentials), StatusCode::UNAUTHORIZED),
            (AppError::Catalog(CatalogError::NotDriver), StatusCode::FORBIDDEN),
            (AppError::Catalog(CatalogError::RouteNotFound), StatusCode::NOT_FOUND),
            (
                AppError::Ride(RideError::Catalog(CatalogError::SeatsUnavailable)),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Ride(RideError::InvalidTransition {
                    from: RideStatus::Completed,
                    to: RideStatus::Accepted,
                }),
                StatusCode::CONFLICT,
            ),
            (AppError::Ride(RideError::NotRideDriver), StatusCode::FORBIDDEN),
            (
                AppError::Ride(RideError::Wallet(WalletError::InsufficientBalance {
                    balance: Money::ZERO,
                    requested: Money::from_major(5500),
                })),
                StatusCode::BAD_REQUEST,
            ),
            (
                AppError::Wallet(WalletError::Repository(RepositoryError::Contention {
                    key: "wallets:x".to_string(),
                })),
                StatusCode::CONFLICT,
            ),
            (
                AppError::Database(RepositoryError::DataCorruption("bad".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::Forbidden("no".to_string()), StatusCode::FORBIDDEN),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status(), expected, "{err}");
        }
    }

    #[tokio::test]
    async fn test_body_is_json_error() {
        let (status, json) = body(AppError::Ride(RideError::AlreadyPaid)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json, json!({"error": "ride is already paid"}));
    }

    #[tokio::test]
    async fn test_internal_details_are_not_leaked() {
        let err = AppError::Ride(RideError::Repository(RepositoryError::DataCorruption(
            "invalid rides document rides:42".to_string(),
        )));
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, json!({"error": "Internal server error"}));
    }
}
