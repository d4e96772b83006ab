//! Documents persisted in the store and returned over HTTP.
//!
//! Field names are camelCase on the wire and in storage.

pub mod ride;
pub mod route;
pub mod session;
pub mod user;
pub mod wallet;

pub use ride::{Rating, Ride};
pub use route::Route;
pub use session::{CurrentUser, SessionRecord};
pub use user::{User, UserRecord};
pub use wallet::{Transaction, Wallet};
