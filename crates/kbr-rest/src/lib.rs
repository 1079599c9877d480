//! Thin `axum` HTTP adapter exposing the backup/restore HTTP surface.
//!
//! Handlers parse the request, delegate to `SnapshotManager`/the
//! reconciliation engine, and map the result to a response; no business
//! logic lives here. One router, one `tower` middleware stack
//! (CORS/trace/timeout).

pub mod error;
pub mod handlers;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use kbr_snapshot::SnapshotManager;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use error::RestError;
pub use state::AppState;

/// Builds the full router: `/backup/*` and `/restore/*`, with tracing, a
/// per-request timeout, and permissive CORS layered on top.
pub fn create_app(manager: Arc<SnapshotManager>, request_timeout: Duration) -> Router {
    let state = AppState::new(manager);

    let router = Router::new()
        .route("/backup/", post(handlers::backup::run_backup))
        .route("/backup/list", get(handlers::backup::list_backups))
        .route("/backup/info", get(handlers::backup::backup_info))
        .route("/backup/{service}/{kind}", get(handlers::backup::export_service_kind))
        .route("/restore/", post(handlers::restore::run_restore))
        .route(
            "/restore/{service}/{kind}",
            post(handlers::restore::import_service_kind),
        )
        .with_state(state);

    let middleware = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any));

    router.layer(middleware)
}

/// Initializes the `tracing` subscriber. Called once at process startup.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kbr={level},kbr_rest={level},tower_http=debug")));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();
}
