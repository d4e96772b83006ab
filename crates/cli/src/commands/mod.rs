pub mod migrate;
pub mod seed;

use secrecy::SecretString;

use carpool_server::config::{ConfigError, ServerConfig};

/// Errors shared by commands that need a database.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Missing environment variable: CARPOOL_DATABASE_URL (or DATABASE_URL)")]
    MissingDatabaseUrl,
}

/// Load server configuration and insist on a database URL.
///
/// The in-memory fallback makes no sense for a one-shot command.
pub fn database_config() -> Result<(ServerConfig, SecretString), CommandError> {
    let config = ServerConfig::from_env()?;
    let url = config
        .database_url
        .clone()
        .ok_or(CommandError::MissingDatabaseUrl)?;
    Ok((config, url))
}
