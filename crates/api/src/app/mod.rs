//! HTTP application wiring.
//!
//! - `services.rs`: storage backends and the listing registry
//! - `routes/`: handlers, one file per area
//! - `dto.rs`: request/response bodies that are not domain types
//! - `errors.rs`: consistent error responses
//! - `download.rs`: export responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use orgdesk_accounts::LogNotifier;
use orgdesk_infra::{MemoryBackend, connect, migrate};

use crate::config::AppConfig;
use crate::middleware;

pub mod download;
pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::{AppServices, Backend};

/// Postgres when `DATABASE_URL` is set, the in-memory backend otherwise.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<Arc<AppServices>> {
    let backend = match &config.database_url {
        Some(url) => {
            let pool = connect(url, config.database_max_connections).await?;
            migrate(&pool).await?;
            tracing::info!("using postgres backend");
            Backend::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; data lives in memory only");
            Backend::memory(MemoryBackend::new())
        }
    };

    let services = AppServices::new(
        backend,
        &config.jwt_secret,
        config.token_ttl_minutes,
        config.export_chunk_size,
    )?
    .with_notifier(Arc::new(LogNotifier::new(config.public_base_url.as_str())));
    Ok(Arc::new(services))
}

/// Build the full HTTP router.
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        jwt: services.jwt.clone(),
    };

    // Setup gate runs first, then authentication.
    let protected = routes::router()
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::setup_gate));

    // Sign-up needs a finished setup but no token.
    let accounts = routes::accounts_router().layer(axum::middleware::from_fn(middleware::setup_gate));

    Router::new()
        .merge(routes::public_router())
        .merge(accounts)
        .merge(protected)
        .layer(Extension(services))
        .layer(TraceLayer::new_for_http())
}
