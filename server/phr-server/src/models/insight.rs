use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Persisted AI analysis, created only when the caller saves one
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HealthInsight {
    pub id: Uuid,
    pub user_id: Uuid,
    pub patient_name: Option<String>,
    pub analyzed_log_ids: Vec<Uuid>,
    pub logs_analyzed_count: i32,
    #[schema(value_type = Option<Object>)]
    pub trends: Option<Value>,
    #[schema(value_type = Option<Object>)]
    pub correlations: Option<Value>,
    pub recommendations: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub alerts: Option<Value>,
    pub insights_raw: Option<String>,
    pub analysis_date: DateTime<Utc>,
    pub data_points_analyzed: i32,
    pub ai_model_used: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Structured sections of a generated analysis, when the model returned them
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct InsightSections {
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub trends: Option<Value>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub correlations: Option<Value>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub alerts: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SaveInsightRequest {
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub log_ids: Vec<Uuid>,
    #[serde(default)]
    pub logs_analyzed: i32,
    /// Either the raw analysis text or an object with structured sections
    #[serde(default)]
    #[schema(value_type = Option<Object>)]
    pub insights: Option<Value>,
    #[serde(default)]
    pub insights_raw: Option<String>,
    #[serde(default)]
    pub data_points_analyzed: i32,
}

impl SaveInsightRequest {
    pub fn into_insight(self, user_id: Uuid, default_name: &str, model: &str) -> HealthInsight {
        let now = Utc::now();
        let sections = match &self.insights {
            Some(value @ Value::Object(_)) => serde_json::from_value::<InsightSections>(value.clone()).unwrap_or_default(),
            _ => InsightSections::default(),
        };
        let insights_raw = self.insights_raw.or_else(|| match self.insights {
            Some(Value::String(text)) => Some(text),
            Some(other) => Some(other.to_string()),
            None => None,
        });

        HealthInsight {
            id: Uuid::new_v4(),
            user_id,
            patient_name: Some(self.patient_name.unwrap_or_else(|| default_name.to_string())),
            analyzed_log_ids: self.log_ids,
            logs_analyzed_count: self.logs_analyzed,
            trends: sections.trends,
            correlations: sections.correlations,
            recommendations: sections.recommendations,
            alerts: sections.alerts,
            insights_raw,
            analysis_date: now,
            data_points_analyzed: self.data_points_analyzed,
            ai_model_used: model.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeSelectedRequest {
    pub log_ids: Vec<Uuid>,
    #[serde(default)]
    pub patient_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct SymptomRequest {
    pub symptom: String,
    #[serde(default = "default_severity")]
    pub severity: String,
}

fn default_severity() -> String {
    "mild".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_history: Vec<ChatMessage>,
}
