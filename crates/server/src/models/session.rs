//! Session-related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use carpool_core::{Email, Role, UserId};

/// Stored under `sessions:{sha256(token)}`. The raw token is never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Owner of the session.
    pub user_id: UserId,
    /// Issue time.
    pub created_at: DateTime<Utc>,
    /// The token is rejected from this instant on.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// `true` once `now` has reached the expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Identity resolved from a bearer token.
///
/// Minimal data handlers need for authorization decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    /// User's ID.
    pub id: UserId,
    /// User's email address.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// Driver or passenger.
    pub role: Role,
}
