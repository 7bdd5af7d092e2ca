use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{require_ownership, require_role, CurrentUser, Operation};
use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::models::{HealthLog, HealthLogCreate, HealthLogUpdate};
use crate::server::PhrServer;
use crate::storage::LogFilter;
use crate::types::pagination::{Page, SkipLimit, DEFAULT_LOG_LIMIT, MAX_LIMIT};
use crate::validation::{ApiJson, RequestValidation};

/// Date range and offset window for listing logs
#[derive(Debug, Deserialize, IntoParams, Default)]
pub struct LogListQuery {
    #[param(minimum = 0)]
    pub skip: Option<i64>,
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
    /// Inclusive lower bound on `log_date`
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `log_date`
    pub end_date: Option<DateTime<Utc>>,
}

impl LogListQuery {
    fn page(&self) -> Page {
        SkipLimit {
            skip: self.skip,
            limit: self.limit,
        }
        .page(DEFAULT_LOG_LIMIT)
    }

    fn filter(&self) -> LogFilter {
        LogFilter {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

#[utoipa::path(
    post,
    path = crate::routes::paths::logs::LOGS,
    tag = "health-logs",
    security(("bearer_auth" = [])),
    request_body = HealthLogCreate,
    responses(
        (status = 201, description = "Log created", body = HealthLog),
        (status = 400, description = "Value out of range"),
        (status = 422, description = "Malformed body or unknown field")
    )
)]
pub async fn create_log(
    State(server): State<PhrServer>,
    current: CurrentUser,
    ApiJson(payload): ApiJson<HealthLogCreate>,
) -> Result<(StatusCode, Json<ApiResponse<HealthLog>>), ApiError> {
    require_role(&current, Operation::CreateLog)?;
    payload.validate()?;

    let log = server.stores.logs.create(payload.into_log(current.id)).await?;
    tracing::info!(user_id = %current.id, log_id = %log.id, "Health log created");

    Ok((StatusCode::CREATED, Json(api_success(log))))
}

/// Caller's logs, newest `log_date` first
#[utoipa::path(
    get,
    path = crate::routes::paths::logs::LOGS,
    tag = "health-logs",
    security(("bearer_auth" = [])),
    params(LogListQuery),
    responses((status = 200, description = "Health logs", body = Vec<HealthLog>))
)]
pub async fn list_logs(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Query(query): Query<LogListQuery>,
) -> Result<Json<ApiResponse<Vec<HealthLog>>>, ApiError> {
    require_role(&current, Operation::ListLogs)?;

    let page = query.page();
    let logs = server.stores.logs.list(current.id, query.filter(), page).await?;
    let metadata = page.to_metadata(logs.len());

    Ok(Json(api_success_with_meta(logs, metadata)))
}

/// Logs recorded since UTC midnight
#[utoipa::path(
    get,
    path = crate::routes::paths::logs::TODAY,
    tag = "health-logs",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Today's health logs", body = Vec<HealthLog>))
)]
pub async fn today_logs(
    State(server): State<PhrServer>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<Vec<HealthLog>>>, ApiError> {
    require_role(&current, Operation::ListLogs)?;

    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc());
    let filter = LogFilter {
        start_date: midnight,
        end_date: None,
    };
    let logs = server.stores.logs.list(current.id, filter, Page::first(MAX_LIMIT)).await?;

    Ok(Json(api_success(logs)))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::logs::LOG_BY_ID,
    tag = "health-logs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Health log id")),
    responses(
        (status = 200, description = "Health log", body = HealthLog),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such log")
    )
)]
pub async fn get_log(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<HealthLog>>, ApiError> {
    let log = server.stores.logs.get(id).await?;
    let log = require_ownership(&current, Operation::ReadLog, log, "Health log")?;
    Ok(Json(api_success(log)))
}

/// Partial update; absent fields keep their stored value
#[utoipa::path(
    put,
    path = crate::routes::paths::logs::LOG_BY_ID,
    tag = "health-logs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Health log id")),
    request_body = HealthLogUpdate,
    responses(
        (status = 200, description = "Updated log", body = HealthLog),
        (status = 400, description = "Value out of range"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such log")
    )
)]
pub async fn update_log(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<HealthLogUpdate>,
) -> Result<Json<ApiResponse<HealthLog>>, ApiError> {
    let log = server.stores.logs.get(id).await?;
    let mut log = require_ownership(&current, Operation::UpdateLog, log, "Health log")?;
    update.validate()?;

    // Read-merge-write with no version check; concurrent edits can lose updates
    update.apply(&mut log);
    let log = server.stores.logs.update(&log).await?;

    Ok(Json(api_success(log)))
}

#[utoipa::path(
    delete,
    path = crate::routes::paths::logs::LOG_BY_ID,
    tag = "health-logs",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Health log id")),
    responses(
        (status = 200, description = "Log deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such log")
    )
)]
pub async fn delete_log(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let log = server.stores.logs.get(id).await?;
    let log = require_ownership(&current, Operation::DeleteLog, log, "Health log")?;

    server.stores.logs.delete(log.id).await?;
    tracing::info!(user_id = %current.id, log_id = %log.id, "Health log deleted");

    Ok(Json(api_success(MessageResponse::new("Health log deleted successfully"))))
}
