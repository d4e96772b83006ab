//! HTTP route handlers for the carpool API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness
//! GET  /health/ready               - Readiness (store round-trip)
//!
//! # Auth
//! POST /auth/register              - Create an account (alias: /auth/signup)
//! POST /auth/login                 - Exchange credentials for a bearer token
//! POST /auth/logout                - Revoke the current token
//! GET  /auth/me                    - Current user
//!
//! # Routes (driver offerings)
//! POST /routes/create              - Publish a route (driver)
//! POST /routes/search              - Search by pickup / destination text
//! GET  /routes?driverId=           - A driver's routes
//! GET  /routes/{id}                - Route detail
//!
//! # Rides
//! POST /rides/request              - Request seats on a route (passenger)
//! GET  /rides/requests?driverId=   - Pending requests for a driver
//! GET  /rides/{id}                 - Ride detail
//! PUT  /rides/{id}/accept          - Driver accepts
//! PUT  /rides/{id}/reject          - Driver rejects
//! PUT  /rides/{id}/seated          - Driver marks passenger seated
//! PUT  /rides/{id}/complete        - Driver completes the trip
//! PUT  /rides/{id}/cancel          - Either party cancels
//! POST /rides/{id}/pay             - Passenger pays from wallet
//! POST /rides/{id}/rate            - Passenger rates the driver
//!
//! # Wallet (requires auth)
//! GET  /wallet?userId=             - Balance and statement
//! POST /wallet/add                 - Top up
//! POST /wallet/withdraw            - Withdraw
//!
//! # Dashboards
//! GET  /driver/dashboard?userId=   - Driver stats and notifications
//! GET  /driver/notifications?userId= - Full notification feed
//! GET  /passenger/dashboard?userId= - Passenger stats and nearby routes
//! ```

pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod rides;
pub mod wallet;

use std::str::FromStr;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
};

use carpool_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/signup", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Create the route catalog router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_for_driver))
        .route("/create", post(catalog::create))
        .route("/search", post(catalog::search))
        .route("/{id}", get(catalog::show))
}

/// Create the ride lifecycle router.
pub fn ride_routes() -> Router<AppState> {
    Router::new()
        .route("/request", post(rides::request))
        .route("/requests", get(rides::pending_requests))
        .route("/{id}", get(rides::show))
        .route("/{id}/accept", put(rides::accept))
        .route("/{id}/reject", put(rides::reject))
        .route("/{id}/seated", put(rides::seated))
        .route("/{id}/complete", put(rides::complete))
        .route("/{id}/cancel", put(rides::cancel))
        .route("/{id}/pay", post(rides::pay))
        .route("/{id}/rate", post(rides::rate))
}

/// Create the wallet router.
pub fn wallet_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wallet::statement))
        .route("/add", post(wallet::add))
        .route("/withdraw", post(wallet::withdraw))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/auth", auth_routes())
        .nest("/routes", catalog_routes())
        .nest("/rides", ride_routes())
        .nest("/wallet", wallet_routes())
        .route("/driver/dashboard", get(dashboard::driver))
        .route("/driver/notifications", get(dashboard::notifications))
        .route("/passenger/dashboard", get(dashboard::passenger))
}

/// Liveness probe.
async fn health() -> &'static str {
    "ok"
}

/// Readiness probe - checks the document store.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Parse an ID from the URL path. A malformed ID cannot name anything, so it is
/// reported as not found.
fn path_id<T: FromStr>(raw: &str, what: &str) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::NotFound(format!("{what} not found")))
}

/// Parse a required user ID query parameter such as `?userId=`.
fn required_user_id(value: Option<&str>, name: &str) -> Result<UserId, AppError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{name} is required")))?;
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("{name} is not a valid ID")))
}
