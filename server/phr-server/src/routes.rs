pub mod paths;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{
    handlers::{admin, ai, auth, doctor, health, logs, reports},
    openapi,
    server::PhrServer,
};

/// Service info, health check and statistics
pub fn health_routes() -> Router<PhrServer> {
    Router::new()
        .route(paths::health::ROOT, get(health::root))
        .route(paths::health::HEALTH, get(health::health_check))
        .route(paths::health::STATS, get(health::stats))
}

/// Registration, login, token refresh and profile
pub fn auth_routes() -> Router<PhrServer> {
    Router::new()
        .route(paths::auth::REGISTER, post(auth::register))
        .route(paths::auth::LOGIN, post(auth::login))
        .route(paths::auth::REFRESH, post(auth::refresh))
        .route(paths::auth::ME, get(auth::me).put(auth::update_me))
        .route(paths::auth::LOGOUT, post(auth::logout))
        .route(paths::auth::VERIFY_TOKEN, get(auth::verify_token))
}

/// Daily health logs
pub fn log_routes() -> Router<PhrServer> {
    Router::new()
        .route(paths::logs::LOGS, post(logs::create_log).get(logs::list_logs))
        .route(paths::logs::TODAY, get(logs::today_logs))
        .route(
            paths::logs::LOG_BY_ID,
            get(logs::get_log).put(logs::update_log).delete(logs::delete_log),
        )
}

/// Medical report files and PDF export
pub fn report_routes() -> Router<PhrServer> {
    Router::new()
        .route(paths::reports::REPORTS, get(reports::list_reports))
        .route(paths::reports::UPLOAD, post(reports::upload_report))
        .route(paths::reports::EXPORT_SUMMARY, get(reports::export_summary))
        .route(
            paths::reports::REPORT_BY_ID,
            get(reports::get_report)
                .put(reports::update_report)
                .delete(reports::delete_report),
        )
}

/// Read-only access for doctors to their assigned patients
pub fn doctor_routes() -> Router<PhrServer> {
    Router::new()
        .route(paths::doctor::PATIENTS, get(doctor::list_patients))
        .route(paths::doctor::PATIENT_REPORTS, get(doctor::patient_reports))
        .route(paths::doctor::PATIENT_LOGS, get(doctor::patient_logs))
}

/// Text-generation insights and saved insights
pub fn ai_routes() -> Router<PhrServer> {
    Router::new()
        .route(paths::ai::ANALYZE_SELECTED, post(ai::analyze_selected))
        .route(paths::ai::INSIGHTS, get(ai::insights))
        .route(paths::ai::SYMPTOM_ADVICE, post(ai::symptom_advice))
        .route(paths::ai::CHAT, post(ai::chat))
        .route(paths::ai::SLEEP_ANALYSIS, get(ai::sleep_analysis))
        .route(paths::ai::SAVED_INSIGHTS, get(ai::list_saved_insights))
        .route(
            paths::ai::SAVED_INSIGHT_BY_ID,
            get(ai::get_saved_insight).delete(ai::delete_saved_insight),
        )
        .route(paths::ai::SAVE_INSIGHT, post(ai::save_insight))
}

/// Doctor assignment and user listing
pub fn admin_routes() -> Router<PhrServer> {
    Router::new()
        .route(paths::admin::ASSIGNMENTS, put(admin::assign_doctor))
        .route(paths::admin::ASSIGNMENT_BY_PATIENT, delete(admin::unassign_doctor))
        .route(paths::admin::USERS, get(admin::list_users))
}

/// Create all application routes
pub fn create_routes() -> Router<PhrServer> {
    Router::new()
        .merge(health_routes())
        .merge(openapi::create_docs_routes())
        .merge(auth_routes())
        .merge(log_routes())
        .merge(report_routes())
        .merge(doctor_routes())
        .merge(ai_routes())
        .merge(admin_routes())
}
