use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{require_doctor_assignment, require_role, CurrentUser, Operation};
use crate::error::{api_success, ApiError, ApiResponse};
use crate::models::{HealthLog, HealthReport, User, UserProfile};
use crate::server::PhrServer;
use crate::storage::LogFilter;
use crate::types::pagination::{Page, MAX_LIMIT};

pub const DEFAULT_PATIENT_LOG_LIMIT: i64 = 30;

#[derive(Debug, Deserialize, IntoParams, Default)]
pub struct PatientLogQuery {
    #[param(minimum = 1, maximum = 100, default = 30)]
    pub limit: Option<i64>,
}

/// Assignment is re-checked from the patient record on every call
async fn assigned_patient(server: &PhrServer, doctor: &User, operation: Operation, patient_id: Uuid) -> Result<User, ApiError> {
    let patient = server.stores.users.find_by_id(patient_id).await?;
    require_doctor_assignment(doctor, operation, patient)
}

/// Patients whose assigned doctor is the caller
#[utoipa::path(
    get,
    path = crate::routes::paths::doctor::PATIENTS,
    tag = "doctor",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Assigned patients", body = Vec<UserProfile>),
        (status = 403, description = "Caller is not a doctor")
    )
)]
pub async fn list_patients(
    State(server): State<PhrServer>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>, ApiError> {
    require_role(&current, Operation::ListAssignedPatients)?;

    let patients = server.stores.users.list_assigned_patients(current.id).await?;
    Ok(Json(api_success(patients.iter().map(UserProfile::from).collect())))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::doctor::PATIENT_REPORTS,
    tag = "doctor",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Patient reports, newest first", body = Vec<HealthReport>),
        (status = 403, description = "Not a doctor or not assigned to the patient"),
        (status = 404, description = "No such patient")
    )
)]
pub async fn patient_reports(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<HealthReport>>>, ApiError> {
    let patient = assigned_patient(&server, &current, Operation::ReadPatientReports, patient_id).await?;

    let mut reports = Vec::new();
    let mut page = Page::first(MAX_LIMIT);
    loop {
        let batch = server.stores.reports.list(patient.id, None, page).await?;
        let exhausted = batch.len() < page.limit_usize();
        for report in batch {
            reports.push(report.open(server.cipher())?);
        }
        if exhausted {
            break;
        }
        page = Page::new(page.skip + page.limit, MAX_LIMIT);
    }

    tracing::info!(
        doctor_id = %current.id,
        patient_id = %patient.id,
        count = reports.len(),
        "Doctor viewed patient reports"
    );
    Ok(Json(api_success(reports)))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::doctor::PATIENT_LOGS,
    tag = "doctor",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Patient id"), PatientLogQuery),
    responses(
        (status = 200, description = "Patient logs, newest first", body = Vec<HealthLog>),
        (status = 403, description = "Not a doctor or not assigned to the patient"),
        (status = 404, description = "No such patient")
    )
)]
pub async fn patient_logs(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Query(query): Query<PatientLogQuery>,
) -> Result<Json<ApiResponse<Vec<HealthLog>>>, ApiError> {
    let patient = assigned_patient(&server, &current, Operation::ReadPatientLogs, patient_id).await?;

    let page = Page::first(query.limit.unwrap_or(DEFAULT_PATIENT_LOG_LIMIT));
    let logs = server.stores.logs.list(patient.id, LogFilter::default(), page).await?;

    tracing::info!(
        doctor_id = %current.id,
        patient_id = %patient.id,
        count = logs.len(),
        "Doctor viewed patient logs"
    );
    Ok(Json(api_success(logs)))
}
