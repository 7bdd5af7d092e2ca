//! AI insight routes
//!
//! Generation endpoints always answer 200 once the caller is authorized; a
//! provider failure shows up in the payload as `error` with
//! `insights: "unavailable"` (or a fallback chat `response`).

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_ownership, require_role, CurrentUser, Operation};
use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::models::{AnalyzeSelectedRequest, ChatRequest, HealthInsight, SaveInsightRequest, SymptomRequest};
use crate::server::PhrServer;
use crate::services::insights::sleep_analysis as summarize_sleep;
use crate::storage::LogFilter;
use crate::types::pagination::Page;
use crate::validate_required;
use crate::validation::ApiJson;

const SLEEP_WINDOW: i64 = 30;
const DEFAULT_INSIGHT_DAYS: i64 = 30;

#[derive(Debug, Deserialize, IntoParams)]
pub struct InsightQuery {
    /// Number of most recent logs to analyze
    #[param(minimum = 1, maximum = 100, default = 30)]
    pub days: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SavedInsight {
    pub message: String,
    pub insight_id: Uuid,
}

/// Append every key of `extra` onto `base`
fn merged(base: Value, extra: Value) -> Value {
    let mut object = match base {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    if let Value::Object(extra) = extra {
        object.extend(extra);
    }
    Value::Object(object)
}

/// Analyze the caller's logs chosen by id
///
/// Ids that do not exist or belong to someone else are skipped.
#[utoipa::path(
    post,
    path = crate::routes::paths::ai::ANALYZE_SELECTED,
    tag = "ai",
    security(("bearer_auth" = [])),
    request_body = AnalyzeSelectedRequest,
    responses(
        (status = 200, description = "Analysis, possibly degraded", body = Object),
        (status = 404, description = "None of the ids matched the caller's logs")
    )
)]
pub async fn analyze_selected(
    State(server): State<PhrServer>,
    current: CurrentUser,
    ApiJson(request): ApiJson<AnalyzeSelectedRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    require_role(&current, Operation::GenerateInsights)?;

    let mut logs = Vec::with_capacity(request.log_ids.len());
    for id in &request.log_ids {
        if let Some(log) = server.stores.logs.get(*id).await? {
            if log.user_id == current.id {
                logs.push(log);
            }
        }
    }
    if logs.is_empty() {
        return Err(ApiError::not_found("Selected health logs"));
    }

    let insights = server.insights.analyze_trends(&current, &logs).await;
    let body = merged(
        json!({
            "patient_name": request.patient_name.unwrap_or_else(|| current.full_name.clone()),
            "logs_analyzed": logs.len(),
            "selected_logs": request.log_ids,
        }),
        insights,
    );
    Ok(Json(api_success(body)))
}

/// Analyze the caller's most recent logs
#[utoipa::path(
    get,
    path = crate::routes::paths::ai::INSIGHTS,
    tag = "ai",
    security(("bearer_auth" = [])),
    params(InsightQuery),
    responses((status = 200, description = "Analysis, possibly degraded", body = Object))
)]
pub async fn insights(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Query(query): Query<InsightQuery>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    require_role(&current, Operation::GenerateInsights)?;

    let days = query.days.unwrap_or(DEFAULT_INSIGHT_DAYS);
    let logs = server
        .stores
        .logs
        .list(current.id, LogFilter::default(), Page::first(days))
        .await?;

    if logs.is_empty() {
        return Ok(Json(api_success(json!({
            "message": "No health data available. Start logging your daily health to get insights!",
            "logs_count": 0,
        }))));
    }

    let insights = server.insights.analyze_trends(&current, &logs).await;
    let body = merged(
        json!({
            "user_name": current.full_name,
            "logs_analyzed": logs.len(),
            "analysis_period_days": days,
        }),
        insights,
    );
    Ok(Json(api_success(body)))
}

#[utoipa::path(
    post,
    path = crate::routes::paths::ai::SYMPTOM_ADVICE,
    tag = "ai",
    security(("bearer_auth" = [])),
    request_body = SymptomRequest,
    responses((status = 200, description = "Advice, possibly degraded", body = Object))
)]
pub async fn symptom_advice(
    State(server): State<PhrServer>,
    current: CurrentUser,
    ApiJson(request): ApiJson<SymptomRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    require_role(&current, Operation::GenerateInsights)?;
    validate_required!(request.symptom, "symptom is required");

    let advice = server
        .insights
        .symptom_advice(request.symptom.trim(), request.severity.trim())
        .await;
    Ok(Json(api_success(advice)))
}

#[utoipa::path(
    post,
    path = crate::routes::paths::ai::CHAT,
    tag = "ai",
    security(("bearer_auth" = [])),
    request_body = ChatRequest,
    responses((status = 200, description = "Assistant reply or fallback", body = Object))
)]
pub async fn chat(
    State(server): State<PhrServer>,
    current: CurrentUser,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    require_role(&current, Operation::GenerateInsights)?;
    validate_required!(request.message, "message is required");

    let reply = server
        .insights
        .chat(&current, &request.message, &request.conversation_history)
        .await;
    Ok(Json(api_success(reply)))
}

/// Averages over the latest nights with recorded sleep
#[utoipa::path(
    get,
    path = crate::routes::paths::ai::SLEEP_ANALYSIS,
    tag = "ai",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Sleep summary", body = Object))
)]
pub async fn sleep_analysis(
    State(server): State<PhrServer>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    require_role(&current, Operation::GenerateInsights)?;

    let logs = server.stores.logs.list_with_sleep(current.id, SLEEP_WINDOW).await?;
    Ok(Json(api_success(summarize_sleep(&logs))))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::ai::SAVED_INSIGHTS,
    tag = "ai",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Saved insights, newest first", body = Vec<HealthInsight>))
)]
pub async fn list_saved_insights(
    State(server): State<PhrServer>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<Vec<HealthInsight>>>, ApiError> {
    require_role(&current, Operation::ListInsights)?;
    let insights = server.stores.insights.list(current.id).await?;
    Ok(Json(api_success(insights)))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::ai::SAVED_INSIGHT_BY_ID,
    tag = "ai",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Insight id")),
    responses(
        (status = 200, description = "Saved insight", body = HealthInsight),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such insight")
    )
)]
pub async fn get_saved_insight(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<HealthInsight>>, ApiError> {
    let insight = server.stores.insights.get(id).await?;
    let insight = require_ownership(&current, Operation::ReadInsight, insight, "Insight")?;
    Ok(Json(api_success(insight)))
}

/// Persist an analysis the caller chose to keep
#[utoipa::path(
    post,
    path = crate::routes::paths::ai::SAVE_INSIGHT,
    tag = "ai",
    security(("bearer_auth" = [])),
    request_body = SaveInsightRequest,
    responses((status = 200, description = "Insight saved", body = SavedInsight))
)]
pub async fn save_insight(
    State(server): State<PhrServer>,
    current: CurrentUser,
    ApiJson(request): ApiJson<SaveInsightRequest>,
) -> Result<Json<ApiResponse<SavedInsight>>, ApiError> {
    require_role(&current, Operation::SaveInsight)?;

    let insight = request.into_insight(current.id, &current.full_name, server.insights.insight_model());
    let insight = server.stores.insights.create(insight).await?;
    tracing::info!(user_id = %current.id, insight_id = %insight.id, "Insight saved");

    Ok(Json(api_success(SavedInsight {
        message: "Insight saved successfully".to_string(),
        insight_id: insight.id,
    })))
}

#[utoipa::path(
    delete,
    path = crate::routes::paths::ai::SAVED_INSIGHT_BY_ID,
    tag = "ai",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Insight id")),
    responses(
        (status = 200, description = "Insight deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such insight")
    )
)]
pub async fn delete_saved_insight(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let insight = server.stores.insights.get(id).await?;
    let insight = require_ownership(&current, Operation::DeleteInsight, insight, "Insight")?;

    server.stores.insights.delete(insight.id).await?;
    Ok(Json(api_success(MessageResponse::new("Insight deleted successfully"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merged_keeps_both_sides() {
        let body = merged(json!({"logs_analyzed": 2}), json!({"error": "x", "insights": "unavailable"}));
        assert_eq!(body["logs_analyzed"], 2);
        assert_eq!(body["insights"], "unavailable");
    }
}
