//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::services::{
    AuthService, CatalogService, DashboardService, RideService, WalletService,
};
use crate::store::DocumentStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Services are built on demand from the shared
/// store; they hold nothing but collection handles.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ServerConfig,
    store: Arc<dyn DocumentStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ServerConfig, store: Arc<dyn DocumentStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Get a reference to the document store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn auth(&self) -> AuthService {
        AuthService::new(self.store(), self.config().session_ttl)
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.store())
    }

    #[must_use]
    pub fn rides(&self) -> RideService {
        RideService::new(self.store(), self.config().service_fee)
    }

    #[must_use]
    pub fn wallet(&self) -> WalletService {
        WalletService::new(self.store())
    }

    #[must_use]
    pub fn dashboard(&self) -> DashboardService {
        DashboardService::new(self.store())
    }
}
