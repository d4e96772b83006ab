//! UB Carpool server library.
//!
//! The HTTP API and everything behind it: the document store, the ride,
//! route and wallet services, and the axum router. The binary in `main.rs`
//! only wires configuration, logging and the listener around [`app`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;

use std::sync::Arc;

use axum::Router;
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use crate::config::ServerConfig;
use crate::state::AppState;
use crate::store::{DocumentStore, MemoryStore, PgDocumentStore};

/// Build the full application: routes plus the request-id, tracing and Sentry
/// layers.
#[must_use]
pub fn app(state: AppState) -> Router {
    routes::routes()
        .layer(axum::middleware::from_fn(
            middleware::request_id_middleware,
        ))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Open the document store the configuration asks for: `PostgreSQL` when a
/// database URL is set, otherwise a process-local in-memory store.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database cannot be reached.
pub async fn open_store(config: &ServerConfig) -> Result<Arc<dyn DocumentStore>, sqlx::Error> {
    match &config.database_url {
        Some(url) => {
            let pool = store::create_pool(url).await?;
            tracing::info!("Database pool created");
            Ok(Arc::new(PgDocumentStore::new(pool)))
        }
        None => {
            tracing::warn!("No database URL configured; documents are kept in memory and lost on exit");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
