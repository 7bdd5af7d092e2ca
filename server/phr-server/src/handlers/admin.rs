//! Administration routes
//!
//! Assignment writes the patient's `assigned_doctor_id` and the doctor's
//! `patients_list` as separate store calls with no transaction. Access checks
//! only ever read `assigned_doctor_id`.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::{require_role, CurrentUser, Operation};
use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse};
use crate::models::{AssignmentRequest, Role, User, UserProfile};
use crate::server::PhrServer;
use crate::types::pagination::SkipLimit;
use crate::validation::ApiJson;

const DEFAULT_USER_LIMIT: i64 = 50;

#[derive(Debug, Deserialize, IntoParams, Default)]
pub struct UserListQuery {
    pub role: Option<Role>,
    #[param(minimum = 0)]
    pub skip: Option<i64>,
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

async fn user_with_role(server: &PhrServer, id: Uuid, role: Role, resource: &str) -> Result<User, ApiError> {
    server
        .stores
        .users
        .find_by_id(id)
        .await?
        .filter(|user| user.role == role)
        .ok_or_else(|| ApiError::not_found(resource))
}

async fn detach_from_doctor(server: &PhrServer, doctor_id: Uuid, patient_id: Uuid) -> Result<(), ApiError> {
    if let Some(mut doctor) = server.stores.users.find_by_id(doctor_id).await? {
        doctor.patients_list.retain(|id| *id != patient_id);
        server.stores.users.update(&doctor).await?;
    }
    Ok(())
}

/// Assign a patient to a doctor, replacing any previous assignment
#[utoipa::path(
    put,
    path = crate::routes::paths::admin::ASSIGNMENTS,
    tag = "admin",
    security(("bearer_auth" = [])),
    request_body = AssignmentRequest,
    responses(
        (status = 200, description = "Updated patient", body = UserProfile),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Patient or doctor not found")
    )
)]
pub async fn assign_doctor(
    State(server): State<PhrServer>,
    current: CurrentUser,
    ApiJson(request): ApiJson<AssignmentRequest>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    require_role(&current, Operation::ManageAssignments)?;

    let mut patient = user_with_role(&server, request.patient_id, Role::Patient, "Patient").await?;
    let mut doctor = user_with_role(&server, request.doctor_id, Role::Doctor, "Doctor").await?;

    if let Some(previous) = patient.assigned_doctor_id.filter(|id| *id != doctor.id) {
        detach_from_doctor(&server, previous, patient.id).await?;
    }

    patient.assigned_doctor_id = Some(doctor.id);
    let patient = server.stores.users.update(&patient).await?;

    if !doctor.patients_list.contains(&patient.id) {
        doctor.patients_list.push(patient.id);
        server.stores.users.update(&doctor).await?;
    }

    tracing::info!(
        admin_id = %current.id,
        patient_id = %patient.id,
        doctor_id = %doctor.id,
        "Doctor assigned to patient"
    );
    Ok(Json(api_success(UserProfile::from(&patient))))
}

#[utoipa::path(
    delete,
    path = crate::routes::paths::admin::ASSIGNMENT_BY_PATIENT,
    tag = "admin",
    security(("bearer_auth" = [])),
    params(("patient_id" = Uuid, Path, description = "Patient id")),
    responses(
        (status = 200, description = "Updated patient", body = UserProfile),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Patient not found")
    )
)]
pub async fn unassign_doctor(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    require_role(&current, Operation::ManageAssignments)?;

    let mut patient = user_with_role(&server, patient_id, Role::Patient, "Patient").await?;
    if let Some(doctor_id) = patient.assigned_doctor_id.take() {
        detach_from_doctor(&server, doctor_id, patient.id).await?;
        patient = server.stores.users.update(&patient).await?;
        tracing::info!(admin_id = %current.id, patient_id = %patient.id, doctor_id = %doctor_id, "Doctor unassigned");
    }

    Ok(Json(api_success(UserProfile::from(&patient))))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::admin::USERS,
    tag = "admin",
    security(("bearer_auth" = [])),
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = Vec<UserProfile>),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_users(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Query(query): Query<UserListQuery>,
) -> Result<Json<ApiResponse<Vec<UserProfile>>>, ApiError> {
    require_role(&current, Operation::ListUsers)?;

    let page = SkipLimit {
        skip: query.skip,
        limit: query.limit,
    }
    .page(DEFAULT_USER_LIMIT);
    let users: Vec<UserProfile> = server
        .stores
        .users
        .list(query.role, page)
        .await?
        .iter()
        .map(UserProfile::from)
        .collect();
    let metadata = page.to_metadata(users.len());

    Ok(Json(api_success_with_meta(users, metadata)))
}
