//! Database migration command.
//!
//! Applies `crates/server/migrations/` to the configured database. The server
//! never migrates on startup, so run this before the first deploy and after
//! every schema change.

use carpool_server::store::create_pool;

use super::{CommandError, database_config};

#[derive(Debug, thiserror::Error)]
pub enum MigrationError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
///
/// # Errors
///
/// Returns `MigrationError` if the database URL is missing, the connection
/// fails, or a migration does not apply.
pub async fn run() -> Result<(), MigrationError> {
    let (_, database_url) = database_config()?;

    tracing::info!("Connecting to database...");
    let pool = create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
