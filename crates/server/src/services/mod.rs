//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, password login, bearer sessions
//! - `catalog` - Route publishing and search
//! - `rides` - Ride lifecycle, payment and rating
//! - `wallet` - Balances and the transaction ledger
//! - `dashboard` - Driver feed and dashboard projections
//!
//! Services own typed [`Collection`](crate::store::Collection) handles and are
//! cheap to build per request from [`AppState`](crate::state::AppState).

pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod rides;
pub mod wallet;

pub use auth::{AuthError, AuthService, Registration};
pub use catalog::{CatalogError, CatalogService, NewRoute};
pub use dashboard::{DashboardError, DashboardService, DriverDashboard, Notification, PassengerDashboard};
pub use rides::{RideError, RideRequest, RideService, TripMetrics};
pub use wallet::{Statement, WalletError, WalletService};
