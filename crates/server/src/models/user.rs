//! User domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carpool_core::{Email, Role, UserId};

/// A registered account as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email, lower-cased.
    pub email: Email,
    /// Contact phone number.
    pub phone: String,
    /// Driver or passenger, fixed at registration.
    pub role: Role,
    /// Car model (drivers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_model: Option<String>,
    /// Licence plate (drivers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_plate: Option<String>,
    /// Driving licence number (drivers only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// `true` if the account may publish routes and drive.
    #[must_use]
    pub fn is_driver(&self) -> bool {
        self.role == Role::Driver
    }
}

/// Stored form of a user: the public fields plus the password hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Public profile.
    #[serde(flatten)]
    pub user: User,
    /// Argon2id PHC string.
    pub password_hash: String,
}
