//! Document store: point lookup by key, prefix enumeration, and
//! compare-and-set writes.
//!
//! # Layout
//!
//! Every entity is one JSON document under `"{collection}:{id}"`:
//!
//! - `users:{user_id}` - account record including the password hash
//! - `user_emails:{email}` - unique email index pointing at a user id
//! - `sessions:{sha256(token)}` - opaque session credentials
//! - `routes:{route_id}` - driver-published routes
//! - `rides:{ride_id}` - ride requests and their lifecycle
//! - `wallets:{user_id}` - balances
//! - `transactions:{transaction_id}` - append-only ledger entries
//! - `ratings:{rating_id}` - passenger ratings of drivers
//!
//! # Concurrency
//!
//! Each document carries a [`Revision`] that increases on every write.
//! [`DocumentStore::put_if`] only writes when the caller's expected revision
//! still matches, and [`Collection::modify`] wraps read-apply-write in a
//! bounded retry loop. All ride, route and wallet mutations go through
//! `modify`, so concurrent writers cannot silently overwrite each other.

mod collection;
pub mod memory;
pub mod postgres;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use collection::{Collection, Versioned};
pub use memory::MemoryStore;
pub use postgres::PgDocumentStore;

/// Monotonic per-document write counter. The first write of a key is revision 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Revision(i64);

impl Revision {
    /// Revision assigned to a freshly inserted document.
    pub const FIRST: Self = Self(1);

    /// Wrap a raw revision number.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// The raw revision number.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// The revision after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A stored document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Full key, including the collection prefix.
    pub key: String,
    /// JSON body.
    pub value: Value,
    /// Current revision.
    pub revision: Revision,
}

/// Errors raised by document store adapters.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the store is corrupted or does not match the expected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// A value could not be serialized for storage.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Compare-and-set failed because the document changed underneath us.
    #[error("revision mismatch on {key}: expected {expected:?}, found {actual:?}")]
    RevisionMismatch {
        /// Document key.
        key: String,
        /// Revision the writer expected (`None` = must not exist).
        expected: Option<Revision>,
        /// Revision actually found (`None` = does not exist).
        actual: Option<Revision>,
    },

    /// Compare-and-set kept losing to concurrent writers.
    #[error("too many concurrent updates to {key}")]
    Contention {
        /// Document key.
        key: String,
    },
}

impl RepositoryError {
    /// `true` if this is a compare-and-set conflict.
    #[must_use]
    pub const fn is_revision_mismatch(&self) -> bool {
        matches!(self, Self::RevisionMismatch { .. })
    }
}

/// Storage backend for JSON documents.
///
/// Adapters must make `put_if` atomic with respect to every other write of the
/// same key; everything else in the crate relies on that guarantee.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a document by key.
    async fn get(&self, key: &str) -> Result<Option<Document>, RepositoryError>;

    /// Unconditional upsert. Last write wins.
    async fn put(&self, key: &str, value: Value) -> Result<Revision, RepositoryError>;

    /// Compare-and-set write.
    ///
    /// `expected = None` inserts only if the key is absent; `Some(r)` replaces
    /// only if the current revision is `r`. Otherwise returns
    /// [`RepositoryError::RevisionMismatch`].
    async fn put_if(
        &self,
        key: &str,
        value: Value,
        expected: Option<Revision>,
    ) -> Result<Revision, RepositoryError>;

    /// Delete a document. Returns `false` if it did not exist.
    async fn delete(&self, key: &str) -> Result<bool, RepositoryError>;

    /// All documents whose key starts with `prefix`, ordered by key.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<Document>, RepositoryError>;

    /// Cheap round-trip used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
