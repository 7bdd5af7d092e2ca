use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{require_role, CurrentUser, Operation};
use crate::error::{api_success, ApiError, ApiResponse};
use crate::server::PhrServer;

/// Service information
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceInfo {
    #[schema(example = "Personal Health Record System")]
    pub name: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    #[schema(example = "running")]
    pub status: String,
    #[schema(example = "/docs")]
    pub docs: String,
}

/// Health check response
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    #[schema(example = "healthy")]
    pub status: String,
    /// Current timestamp in RFC3339 format
    #[schema(example = "2025-01-15T10:30:00Z")]
    pub timestamp: String,
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Individual dependency checks
    pub checks: HashMap<String, String>,
}

/// Record counts for administrators
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_users: i64,
    pub total_reports: i64,
    pub total_logs: i64,
}

#[utoipa::path(
    get,
    path = crate::routes::paths::health::ROOT,
    tag = "health",
    responses((status = 200, description = "Service information", body = ServiceInfo))
)]
pub async fn root(State(server): State<PhrServer>) -> Json<ApiResponse<ServiceInfo>> {
    Json(api_success(ServiceInfo {
        name: server.config.app_name.clone(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        status: "running".to_string(),
        docs: "/docs".to_string(),
    }))
}

/// Health check handler
#[utoipa::path(
    get,
    path = crate::routes::paths::health::HEALTH,
    tag = "health",
    responses(
        (status = 200, description = "System is healthy", body = HealthResponse),
        (status = 503, description = "Database unreachable", body = HealthResponse)
    )
)]
pub async fn health_check(State(server): State<PhrServer>) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let database = match (&server.db_pool, server.database_healthy().await) {
        (None, _) => "in-memory",
        (Some(_), true) => "connected",
        (Some(_), false) => "unreachable",
    };
    let healthy = database != "unreachable";

    let mut checks = HashMap::new();
    checks.insert("database".to_string(), database.to_string());
    checks.insert(
        "encryption".to_string(),
        if server.cipher.is_some() { "enabled" } else { "disabled" }.to_string(),
    );

    let response = HealthResponse {
        status: if healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
    };
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status, Json(api_success(response)))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::health::STATS,
    tag = "health",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Record counts", body = StatsResponse),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn stats(
    State(server): State<PhrServer>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<StatsResponse>>, ApiError> {
    require_role(&current, Operation::ViewStats)?;

    Ok(Json(api_success(StatsResponse {
        total_users: server.stores.users.count().await?,
        total_reports: server.stores.reports.count().await?,
        total_logs: server.stores.logs.count().await?,
    })))
}
