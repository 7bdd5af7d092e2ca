use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::AppConfig;
use crate::server::PhrServer;

const SLOW_REQUEST_THRESHOLD: Duration = Duration::from_secs(1);

/// Request timing middleware for performance monitoring
pub async fn request_timing_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed();

    if duration > SLOW_REQUEST_THRESHOLD {
        tracing::warn!(
            path = %path,
            duration_ms = duration.as_millis(),
            "Slow request detected"
        );
    }

    response
}

/// One audit line per request, with identifiers in the path and query redacted
pub async fn audit_logging_middleware(State(server): State<PhrServer>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| request.uri().path().to_string(), ToString::to_string);
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(ToString::to_string);

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        path = %server.redactor.redact(&target),
        status = %response.status(),
        user_agent = ?user_agent,
        "API request audit"
    );

    response
}

/// CORS layer for the configured origin list; `*` allows any origin
pub fn create_cors_layer(config: &AppConfig) -> CorsLayer {
    let origins = config.allowed_origins();
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::from(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(3600))
}
