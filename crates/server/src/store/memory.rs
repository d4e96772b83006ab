//! In-process document store.
//!
//! Used when no database URL is configured and by the test suites. A single
//! `RwLock` serializes writers, which makes `put_if` trivially atomic.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, RepositoryError, Revision};

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    revision: Revision,
}

/// `BTreeMap`-backed [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).map(|entry| Document {
            key: key.to_owned(),
            value: entry.value.clone(),
            revision: entry.revision,
        }))
    }

    async fn put(&self, key: &str, value: Value) -> Result<Revision, RepositoryError> {
        let mut entries = self.entries.write().await;
        let revision = entries
            .get(key)
            .map_or(Revision::FIRST, |entry| entry.revision.next());
        entries.insert(key.to_owned(), Entry { value, revision });
        Ok(revision)
    }

    async fn put_if(
        &self,
        key: &str,
        value: Value,
        expected: Option<Revision>,
    ) -> Result<Revision, RepositoryError> {
        let mut entries = self.entries.write().await;
        let actual = entries.get(key).map(|entry| entry.revision);
        if actual != expected {
            return Err(RepositoryError::RevisionMismatch {
                key: key.to_owned(),
                expected,
                actual,
            });
        }

        let revision = actual.map_or(Revision::FIRST, Revision::next);
        entries.insert(key.to_owned(), Entry { value, revision });
        Ok(revision)
    }

    async fn delete(&self, key: &str) -> Result<bool, RepositoryError> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<Document>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, entry)| Document {
                key: key.clone(),
                value: entry.value.clone(),
                revision: entry.revision,
            })
            .collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
