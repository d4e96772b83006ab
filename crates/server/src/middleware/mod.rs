//! HTTP middleware stack for the carpool API.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transaction per route)
//! 2. `TraceLayer` (request span)
//! 3. Request ID (add unique ID to each request)
//!
//! Authentication is an extractor rather than a layer so public and protected
//! routes can share one router.

pub mod auth;
pub mod request_id;

pub use auth::{RequireAuth, bearer_token};
pub use request_id::request_id_middleware;
