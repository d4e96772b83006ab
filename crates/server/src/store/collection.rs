//! Typed view over one key prefix of a [`DocumentStore`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Document, DocumentStore, RepositoryError, Revision};

/// How many times [`Collection::modify`] re-reads a document after losing a
/// compare-and-set race before giving up with [`RepositoryError::Contention`].
const MAX_ATTEMPTS: usize = 32;

/// A decoded document together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct Versioned<T> {
    /// Decoded body.
    pub value: T,
    /// Revision at read time.
    pub revision: Revision,
}

/// Documents of type `T` stored under `"{name}:{id}"`.
pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            name: self.name,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Collection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection").field("name", &self.name).finish()
    }
}

impl<T> Collection<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    /// Bind a collection name to a store.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, name: &'static str) -> Self {
        Self {
            store,
            name,
            _marker: PhantomData,
        }
    }

    /// Full store key for `id`.
    pub fn key(&self, id: impl fmt::Display) -> String {
        format!("{}:{id}", self.name)
    }

    fn decode(&self, doc: Document) -> Result<Versioned<T>, RepositoryError> {
        let value = serde_json::from_value(doc.value).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid {} document {}: {e}", self.name, doc.key))
        })?;
        Ok(Versioned {
            value,
            revision: doc.revision,
        })
    }

    /// Fetch and decode one document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored JSON does not decode as `T`.
    pub async fn get(&self, id: impl fmt::Display) -> Result<Option<T>, RepositoryError> {
        Ok(self.get_versioned(id).await?.map(|v| v.value))
    }

    /// Fetch one document along with its revision.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on store or decode failure.
    pub async fn get_versioned(
        &self,
        id: impl fmt::Display,
    ) -> Result<Option<Versioned<T>>, RepositoryError> {
        let key = self.key(id);
        self.store
            .get(&key)
            .await?
            .map(|doc| self.decode(doc))
            .transpose()
    }

    /// Insert a new document, failing if the key already exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::RevisionMismatch` if the key is taken.
    pub async fn insert(&self, id: impl fmt::Display, value: &T) -> Result<(), RepositoryError> {
        let key = self.key(id);
        let json = serde_json::to_value(value)?;
        self.store.put_if(&key, json, None).await?;
        Ok(())
    }

    /// Unconditional write. Only for documents with a single writer.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on store failure.
    pub async fn put(&self, id: impl fmt::Display, value: &T) -> Result<(), RepositoryError> {
        let key = self.key(id);
        let json = serde_json::to_value(value)?;
        self.store.put(&key, json).await?;
        Ok(())
    }

    /// Delete a document.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on store failure.
    pub async fn remove(&self, id: impl fmt::Display) -> Result<bool, RepositoryError> {
        let key = self.key(id);
        self.store.delete(&key).await
    }

    /// Every document in the collection, ordered by key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` on store or decode failure.
    pub async fn all(&self) -> Result<Vec<T>, RepositoryError> {
        let prefix = format!("{}:", self.name);
        self.store
            .scan_prefix(&prefix)
            .await?
            .into_iter()
            .map(|doc| self.decode(doc).map(|v| v.value))
            .collect()
    }

    /// Read-apply-write with optimistic concurrency.
    ///
    /// `apply` receives the current value (`None` if absent) and returns the
    /// replacement or an error that aborts without writing. If another writer
    /// commits between our read and write, the document is re-read and
    /// `apply` runs again, so it must not have side effects.
    ///
    /// # Errors
    ///
    /// Returns whatever `apply` returns, or a store error converted into `E`.
    /// Exhausting the retry budget yields `RepositoryError::Contention`.
    pub async fn modify<F, E>(&self, id: impl fmt::Display, mut apply: F) -> Result<T, E>
    where
        F: FnMut(Option<T>) -> Result<T, E> + Send,
        E: From<RepositoryError>,
    {
        let key = self.key(id);

        for attempt in 1..=MAX_ATTEMPTS {
            let current = match self.store.get(&key).await? {
                Some(doc) => Some(self.decode(doc)?),
                None => None,
            };
            let expected = current.as_ref().map(|v| v.revision);

            let next = apply(current.map(|v| v.value))?;
            let json = serde_json::to_value(&next).map_err(RepositoryError::from)?;

            match self.store.put_if(&key, json, expected).await {
                Ok(_) => return Ok(next),
                Err(e) if e.is_revision_mismatch() => {
                    tracing::debug!(key = %key, attempt, "revision mismatch, retrying");
                    tokio::task::yield_now().await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(key = %key, "giving up after {MAX_ATTEMPTS} conflicting writes");
        Err(RepositoryError::Contention { key }.into())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::store::MemoryStore;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        n: u32,
    }

    #[derive(Debug, thiserror::Error)]
    enum TestError {
        #[error(transparent)]
        Repo(#[from] RepositoryError),
        #[error("too big")]
        TooBig,
    }

    fn counters() -> Collection<Counter> {
        Collection::new(Arc::new(MemoryStore::new()), "counters")
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let col = counters();
        col.insert("a", &Counter { n: 1 }).await.unwrap();
        assert_eq!(col.get("a").await.unwrap(), Some(Counter { n: 1 }));
        assert!(col.insert("a", &Counter { n: 2 }).await.unwrap_err().is_revision_mismatch());
    }

    #[tokio::test]
    async fn test_modify_creates_and_updates() {
        let col = counters();
        let bump = |cur: Option<Counter>| -> Result<Counter, TestError> {
            Ok(Counter {
                n: cur.map_or(0, |c| c.n) + 1,
            })
        };
        col.modify("a", bump).await.unwrap();
        let out = col.modify("a", bump).await.unwrap();
        assert_eq!(out.n, 2);
    }

    #[tokio::test]
    async fn test_modify_error_leaves_document_untouched() {
        let col = counters();
        col.insert("a", &Counter { n: 5 }).await.unwrap();
        let err = col
            .modify("a", |_| Err::<Counter, _>(TestError::TooBig))
            .await
            .unwrap_err();
        assert!(matches!(err, TestError::TooBig));
        assert_eq!(col.get("a").await.unwrap().unwrap().n, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_modify_loses_nothing() {
        let col = counters();
        col.insert("shared", &Counter { n: 0 }).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let col = col.clone();
            handles.push(tokio::spawn(async move {
                col.modify("shared", |cur: Option<Counter>| -> Result<Counter, TestError> {
                    Ok(Counter {
                        n: cur.map_or(0, |c| c.n) + 1,
                    })
                })
                .await
                .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(col.get("shared").await.unwrap().unwrap().n, 20);
    }

    #[tokio::test]
    async fn test_all_skips_other_collections() {
        let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
        let a: Collection<Counter> = Collection::new(Arc::clone(&store), "a");
        let b: Collection<Counter> = Collection::new(store, "b");
        a.insert(1, &Counter { n: 1 }).await.unwrap();
        b.insert(1, &Counter { n: 2 }).await.unwrap();
        assert_eq!(a.all().await.unwrap(), vec![Counter { n: 1 }]);
    }
}
