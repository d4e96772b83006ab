//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `CARPOOL_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; without either the server keeps documents in memory)
//! - `CARPOOL_HOST` - Bind address (default: 127.0.0.1)
//! - `CARPOOL_PORT` - Listen port (default: 5050)
//! - `CARPOOL_SERVICE_FEE` - Fee added to every ride fare, in tugrik (default: 500)
//! - `CARPOOL_SESSION_TTL_HOURS` - Session lifetime (default: 168)
//! - `CARPOOL_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use chrono::TimeDelta;
use secrecy::SecretString;
use thiserror::Error;

use carpool_core::{Decimal, Money};

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("expected `pretty` or `json`, got `{other}`")),
        }
    }
}

/// Carpool server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` connection URL (contains password). `None` selects the in-memory store.
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Platform fee added to each ride's fare
    pub service_fee: Money,
    /// How long a login session stays valid
    pub session_ttl: TimeDelta,
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` naming the first bad variable.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let database_url = env.database_url("CARPOOL_DATABASE_URL");
        let host = env.parse_or("CARPOOL_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = env.parse_or("CARPOOL_PORT", 5050_u16)?;

        let fee: Decimal = env.parse_or("CARPOOL_SERVICE_FEE", Decimal::from(500))?;
        let service_fee = Money::new(fee);
        if fee.is_sign_negative() || !service_fee.has_valid_scale() {
            return Err(ConfigError::InvalidEnvVar(
                "CARPOOL_SERVICE_FEE".to_string(),
                "must be a non-negative amount with at most two decimal places".to_string(),
            ));
        }

        let ttl_hours: i64 = env.parse_or("CARPOOL_SESSION_TTL_HOURS", 168)?;
        let session_ttl = TimeDelta::try_hours(ttl_hours)
            .filter(|ttl| *ttl > TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "CARPOOL_SESSION_TTL_HOURS".to_string(),
                    format!("{ttl_hours} is not a usable number of hours"),
                )
            })?;

        Ok(Self {
            database_url,
            host,
            port,
            service_fee,
            session_ttl,
            log_format: env.parse_or("CARPOOL_LOG_FORMAT", LogFormat::Pretty)?,
            sentry_dsn: env.get_optional("SENTRY_DSN"),
            sentry_environment: env.get_optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    /// All defaults, in-memory store.
    fn default() -> Self {
        Self {
            database_url: None,
            host: IpAddr::from([127, 0, 0, 1]),
            port: 5050,
            service_fee: Money::from_major(500),
            session_ttl: TimeDelta::hours(168),
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F> Env<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Get an optional variable, treating empty as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn database_url(&self, primary_key: &str) -> Option<SecretString> {
        self.get_optional(primary_key)
            .or_else(|| self.get_optional("DATABASE_URL"))
            .map(SecretString::from)
    }

    /// Parse a variable, or return `default` when it is unset.
    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get_optional(key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
            None => Ok(default),
        }
    }
}
