//! Personal Health Record server
//!
//! Patients keep daily health logs and upload medical reports, doctors read
//! the records of the patients assigned to them, and administrators manage
//! those assignments. Text-generation insights are layered on top of the
//! logs and degrade to a placeholder payload when the provider is down.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::*;
pub use server::PhrServer;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Multipart framing on top of the largest accepted upload
const BODY_LIMIT_OVERHEAD: usize = 64 * 1024;

/// Create the main application router with all routes and middleware
pub fn create_app(server: PhrServer) -> Router {
    let body_limit = server.config.max_file_size.saturating_add(BODY_LIMIT_OVERHEAD);

    routes::create_routes()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::create_cors_layer(&server.config))
                .layer(from_fn(middleware::request_timing_middleware))
                .layer(from_fn_with_state(server.clone(), middleware::audit_logging_middleware))
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(server)
}
