use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::server::PhrServer;

/// Main OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health endpoints
        crate::handlers::health::root,
        crate::handlers::health::health_check,
        crate::handlers::health::stats,

        // Authentication endpoints
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::me,
        crate::handlers::auth::update_me,
        crate::handlers::auth::logout,
        crate::handlers::auth::verify_token,

        // Health log endpoints
        crate::handlers::logs::create_log,
        crate::handlers::logs::list_logs,
        crate::handlers::logs::today_logs,
        crate::handlers::logs::get_log,
        crate::handlers::logs::update_log,
        crate::handlers::logs::delete_log,

        // Report endpoints
        crate::handlers::reports::upload_report,
        crate::handlers::reports::list_reports,
        crate::handlers::reports::export_summary,
        crate::handlers::reports::get_report,
        crate::handlers::reports::update_report,
        crate::handlers::reports::delete_report,

        // Doctor endpoints
        crate::handlers::doctor::list_patients,
        crate::handlers::doctor::patient_reports,
        crate::handlers::doctor::patient_logs,

        // AI endpoints
        crate::handlers::ai::analyze_selected,
        crate::handlers::ai::insights,
        crate::handlers::ai::symptom_advice,
        crate::handlers::ai::chat,
        crate::handlers::ai::sleep_analysis,
        crate::handlers::ai::list_saved_insights,
        crate::handlers::ai::get_saved_insight,
        crate::handlers::ai::save_insight,
        crate::handlers::ai::delete_saved_insight,

        // Admin endpoints
        crate::handlers::admin::assign_doctor,
        crate::handlers::admin::unassign_doctor,
        crate::handlers::admin::list_users,
    ),
    components(
        schemas(
            crate::error::ApiErrorResponse,
            crate::error::ResponseMetadata,
            crate::handlers::MessageResponse,

            crate::handlers::health::ServiceInfo,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::StatsResponse,

            crate::handlers::auth::TokenVerification,
            crate::models::RegisterRequest,
            crate::models::LoginRequest,
            crate::models::RefreshRequest,
            crate::models::TokenResponse,
            crate::models::UserProfile,
            crate::models::UserUpdate,
            crate::models::Role,

            crate::models::HealthLog,
            crate::models::HealthLogCreate,
            crate::models::HealthLogUpdate,
            crate::models::Mood,
            crate::models::Severity,

            crate::models::HealthReport,
            crate::models::ReportUpdate,
            crate::models::ReportType,
            crate::handlers::reports::ReportUploadForm,

            crate::models::HealthInsight,
            crate::models::InsightSections,
            crate::models::SaveInsightRequest,
            crate::models::AnalyzeSelectedRequest,
            crate::models::SymptomRequest,
            crate::models::ChatMessage,
            crate::models::ChatRequest,
            crate::handlers::ai::SavedInsight,

            crate::models::AssignmentRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Service status and statistics"),
        (name = "authentication", description = "Registration, login and tokens"),
        (name = "logs", description = "Daily health logs"),
        (name = "reports", description = "Medical report files and summary export"),
        (name = "doctor", description = "Doctor access to assigned patients"),
        (name = "ai", description = "Generated health insights"),
        (name = "admin", description = "Doctor assignment and user administration"),
    ),
    info(
        title = "Personal Health Record API",
        version = "0.1.0",
        description = "Patients record daily health logs and medical reports; assigned doctors read them; administrators manage assignments.",
        license(
            name = "AGPL-3.0-only",
        ),
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server"),
    ),
)]
pub struct ApiDoc;

/// Registers the JWT bearer scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create OpenAPI documentation routes
pub fn create_docs_routes() -> Router<PhrServer> {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
