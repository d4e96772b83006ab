//! `PostgreSQL` adapter for [`DocumentStore`].
//!
//! One table, `carpool.document`, holds every document as JSONB. The revision
//! column makes `put_if` a single conditional statement, so atomicity comes
//! from row-level locking rather than explicit transactions.
//!
//! Migrations live in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p carpool-cli -- migrate
//! ```

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::types::Json;

use super::{Document, DocumentStore, RepositoryError, Revision};

#[derive(sqlx::FromRow)]
struct DocumentRow {
    key: String,
    value: Json<Value>,
    revision: i64,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            key: row.key,
            value: row.value.0,
            revision: Revision::new(row.revision),
        }
    }
}

/// Escape `LIKE` metacharacters so a key prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Document store backed by a `PgPool`.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn current_revision(&self, key: &str) -> Result<Option<Revision>, RepositoryError> {
        let revision: Option<i64> =
            sqlx::query_scalar("SELECT revision FROM carpool.document WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(revision.map(Revision::new))
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, key: &str) -> Result<Option<Document>, RepositoryError> {
        let row: Option<DocumentRow> = sqlx::query_as(
            r"
            SELECT key, value, revision
            FROM carpool.document
            WHERE key = $1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn put(&self, key: &str, value: Value) -> Result<Revision, RepositoryError> {
        let revision: i64 = sqlx::query_scalar(
            r"
            INSERT INTO carpool.document (key, value, revision)
            VALUES ($1, $2, 1)
            ON CONFLICT (key) DO UPDATE
                SET value = EXCLUDED.value,
                    revision = carpool.document.revision + 1,
                    updated_at = now()
            RETURNING revision
            ",
        )
        .bind(key)
        .bind(Json(value))
        .fetch_one(&self.pool)
        .await?;

        Ok(Revision::new(revision))
    }

    async fn put_if(
        &self,
        key: &str,
        value: Value,
        expected: Option<Revision>,
    ) -> Result<Revision, RepositoryError> {
        let written: Option<i64> = match expected {
            None => {
                sqlx::query_scalar(
                    r"
                    INSERT INTO carpool.document (key, value, revision)
                    VALUES ($1, $2, 1)
                    ON CONFLICT (key) DO NOTHING
                    RETURNING revision
                    ",
                )
                .bind(key)
                .bind(Json(value))
                .fetch_optional(&self.pool)
                .await?
            }
            Some(revision) => {
                sqlx::query_scalar(
                    r"
                    UPDATE carpool.document
                    SET value = $2, revision = revision + 1, updated_at = now()
                    WHERE key = $1 AND revision = $3
                    RETURNING revision
                    ",
                )
                .bind(key)
                .bind(Json(value))
                .bind(revision.get())
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match written {
            Some(revision) => Ok(Revision::new(revision)),
            None => Err(RepositoryError::RevisionMismatch {
                key: key.to_owned(),
                expected,
                actual: self.current_revision(key).await?,
            }),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM carpool.document WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<Document>, RepositoryError> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            r"
            SELECT key, value, revision
            FROM carpool.document
            WHERE key LIKE $1 ESCAPE '\'
            ORDER BY key
            ",
        )
        .bind(like_prefix(prefix))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::like_prefix;

    #[test]
    fn test_like_prefix_escapes_metacharacters() {
        assert_eq!(like_prefix("rides:"), "rides:%");
        assert_eq!(like_prefix("user_emails:"), "user\\_emails:%");
        assert_eq!(like_prefix("a%b\\"), "a\\%b\\\\%");
    }
}
