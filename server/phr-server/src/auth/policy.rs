//! Access policy
//!
//! Every guarded operation has one row in [`POLICY_TABLE`]: the roles that
//! may invoke it and the per-record rule applied once the target record is
//! loaded. [`authorize`] is the only evaluator; the `require_*` helpers
//! load-check-evaluate in the order the API promises (missing records are
//! reported before foreign ones).

use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{HealthInsight, HealthLog, HealthReport, Role, User};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ReadProfile,
    UpdateProfile,

    CreateLog,
    ListLogs,
    ReadLog,
    UpdateLog,
    DeleteLog,

    UploadReport,
    ListReports,
    ExportSummary,
    ReadReport,
    UpdateReport,
    DeleteReport,

    ListAssignedPatients,
    ReadPatientReports,
    ReadPatientLogs,

    GenerateInsights,
    SaveInsight,
    ListInsights,
    ReadInsight,
    DeleteInsight,

    ManageAssignments,
    ListUsers,
    ViewStats,
}

impl Operation {
    pub const ALL: [Operation; 24] = [
        Operation::ReadProfile,
        Operation::UpdateProfile,
        Operation::CreateLog,
        Operation::ListLogs,
        Operation::ReadLog,
        Operation::UpdateLog,
        Operation::DeleteLog,
        Operation::UploadReport,
        Operation::ListReports,
        Operation::ExportSummary,
        Operation::ReadReport,
        Operation::UpdateReport,
        Operation::DeleteReport,
        Operation::ListAssignedPatients,
        Operation::ReadPatientReports,
        Operation::ReadPatientLogs,
        Operation::GenerateInsights,
        Operation::SaveInsight,
        Operation::ListInsights,
        Operation::ReadInsight,
        Operation::DeleteInsight,
        Operation::ManageAssignments,
        Operation::ListUsers,
        Operation::ViewStats,
    ];
}

/// Check applied to the loaded target record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordRule {
    /// Collection-level or caller-scoped; nothing to check
    None,
    /// Record owner must be the caller
    Owner,
    /// Target patient must be assigned to the calling doctor
    DoctorAssignment,
}

#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub roles: &'static [Role],
    pub record: RecordRule,
}

const ANY_ROLE: &[Role] = &[Role::Patient, Role::Doctor, Role::Admin];
const DOCTOR: &[Role] = &[Role::Doctor];
const ADMIN: &[Role] = &[Role::Admin];

const fn policy(roles: &'static [Role], record: RecordRule) -> Policy {
    Policy { roles, record }
}

pub static POLICY_TABLE: &[(Operation, Policy)] = &[
    (Operation::ReadProfile, policy(ANY_ROLE, RecordRule::None)),
    (Operation::UpdateProfile, policy(ANY_ROLE, RecordRule::None)),
    // Health logs
    (Operation::CreateLog, policy(ANY_ROLE, RecordRule::None)),
    (Operation::ListLogs, policy(ANY_ROLE, RecordRule::None)),
    (Operation::ReadLog, policy(ANY_ROLE, RecordRule::Owner)),
    (Operation::UpdateLog, policy(ANY_ROLE, RecordRule::Owner)),
    (Operation::DeleteLog, policy(ANY_ROLE, RecordRule::Owner)),
    // Reports
    (Operation::UploadReport, policy(ANY_ROLE, RecordRule::None)),
    (Operation::ListReports, policy(ANY_ROLE, RecordRule::None)),
    (Operation::ExportSummary, policy(ANY_ROLE, RecordRule::None)),
    (Operation::ReadReport, policy(ANY_ROLE, RecordRule::Owner)),
    (Operation::UpdateReport, policy(ANY_ROLE, RecordRule::Owner)),
    (Operation::DeleteReport, policy(ANY_ROLE, RecordRule::Owner)),
    // Doctor access
    (Operation::ListAssignedPatients, policy(DOCTOR, RecordRule::None)),
    (Operation::ReadPatientReports, policy(DOCTOR, RecordRule::DoctorAssignment)),
    (Operation::ReadPatientLogs, policy(DOCTOR, RecordRule::DoctorAssignment)),
    // AI insights
    (Operation::GenerateInsights, policy(ANY_ROLE, RecordRule::None)),
    (Operation::SaveInsight, policy(ANY_ROLE, RecordRule::None)),
    (Operation::ListInsights, policy(ANY_ROLE, RecordRule::None)),
    (Operation::ReadInsight, policy(ANY_ROLE, RecordRule::Owner)),
    (Operation::DeleteInsight, policy(ANY_ROLE, RecordRule::Owner)),
    // Administration
    (Operation::ManageAssignments, policy(ADMIN, RecordRule::None)),
    (Operation::ListUsers, policy(ADMIN, RecordRule::None)),
    (Operation::ViewStats, policy(ADMIN, RecordRule::None)),
];

/// Unlisted operations are denied to everyone
const DENY_ALL: Policy = policy(&[], RecordRule::None);

pub fn policy_for(operation: Operation) -> &'static Policy {
    POLICY_TABLE
        .iter()
        .find(|(op, _)| *op == operation)
        .map_or(&DENY_ALL, |(_, policy)| policy)
}

/// Records with a single owning user
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

impl Owned for HealthLog {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Owned for HealthReport {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

impl Owned for HealthInsight {
    fn owner_id(&self) -> Uuid {
        self.user_id
    }
}

/// What the operation acts on, already loaded
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Collection,
    Record { owner_id: Uuid },
    Patient(&'a User),
}

/// Evaluate the policy row for `operation` against `caller` and `target`
pub fn authorize(caller: &User, operation: Operation, target: Target<'_>) -> Result<(), ApiError> {
    let policy = check_role(caller, operation)?;

    match (policy.record, target) {
        (RecordRule::None, _) => Ok(()),
        (RecordRule::Owner, Target::Record { owner_id }) => {
            if owner_id == caller.id {
                Ok(())
            } else {
                tracing::warn!(user_id = %caller.id, operation = ?operation, "Ownership check failed");
                Err(ApiError::authorization("Access denied"))
            }
        }
        (RecordRule::DoctorAssignment, Target::Patient(patient)) => {
            if patient.assigned_doctor_id == Some(caller.id) {
                Ok(())
            } else {
                tracing::warn!(
                    doctor_id = %caller.id,
                    patient_id = %patient.id,
                    "Doctor not assigned to patient"
                );
                Err(ApiError::authorization(
                    "You don't have access to this patient's records",
                ))
            }
        }
        (rule, target) => Err(ApiError::internal(format!(
            "policy target mismatch for {operation:?}: {rule:?} against {target:?}"
        ))),
    }
}

fn check_role(caller: &User, operation: Operation) -> Result<&'static Policy, ApiError> {
    let policy = policy_for(operation);
    if policy.roles.contains(&caller.role) {
        return Ok(policy);
    }
    tracing::warn!(
        user_id = %caller.id,
        role = %caller.role,
        operation = ?operation,
        "Role not permitted"
    );
    Err(ApiError::authorization(format!(
        "Access denied. Required role: {}",
        role_list(policy.roles)
    )))
}

/// Role-only check for collection-level operations
pub fn require_role(caller: &User, operation: Operation) -> Result<(), ApiError> {
    authorize(caller, operation, Target::Collection)
}

/// 404 when the record is absent, then the owner rule
pub fn require_ownership<R: Owned>(
    caller: &User,
    operation: Operation,
    record: Option<R>,
    resource: &str,
) -> Result<R, ApiError> {
    let record = record.ok_or_else(|| ApiError::not_found(resource))?;
    authorize(
        caller,
        operation,
        Target::Record {
            owner_id: record.owner_id(),
        },
    )?;
    Ok(record)
}

/// Role first, then 404 for an absent or non-patient target, then assignment
pub fn require_doctor_assignment(caller: &User, operation: Operation, patient: Option<User>) -> Result<User, ApiError> {
    check_role(caller, operation)?;
    let patient = patient
        .filter(|user| user.role == Role::Patient)
        .ok_or_else(|| ApiError::not_found("Patient"))?;
    authorize(caller, operation, Target::Patient(&patient))?;
    Ok(patient)
}

fn role_list(roles: &[Role]) -> String {
    roles.iter().map(|role| role.as_str()).collect::<Vec<_>>().join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::collections::HashSet;

    fn user(role: Role) -> User {
        User::new(format!("{}@example.com", Uuid::new_v4()), "h".into(), "U".into(), None, role)
    }

    #[test]
    fn test_every_operation_has_exactly_one_row() {
        let listed: Vec<Operation> = POLICY_TABLE.iter().map(|(op, _)| *op).collect();
        let unique: HashSet<Operation> = listed.iter().copied().collect();
        assert_eq!(listed.len(), unique.len(), "duplicate policy rows");
        for op in Operation::ALL {
            assert!(unique.contains(&op), "{op:?} has no policy row");
        }
    }

    #[test]
    fn test_admin_operations_reject_other_roles() {
        for role in [Role::Patient, Role::Doctor] {
            let err = require_role(&user(role), Operation::ViewStats).unwrap_err();
            assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        }
        assert!(require_role(&user(Role::Admin), Operation::ManageAssignments).is_ok());
    }

    #[test]
    fn test_missing_record_is_not_found_before_forbidden() {
        let caller = user(Role::Patient);
        let err = require_ownership::<HealthLog>(&caller, Operation::ReadLog, None, "Health log").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_foreign_record_is_forbidden() {
        let caller = user(Role::Doctor);
        let log = crate::models::HealthLogCreate {
            stress_level: 5,
            anxiety_level: 5,
            sleep_quality: 5,
            ..Default::default()
        }
        .into_log(Uuid::new_v4());

        let err = require_ownership(&caller, Operation::UpdateLog, Some(log.clone()), "Health log").unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        let owner_view = require_ownership(&user_with_id(log.user_id), Operation::UpdateLog, Some(log), "Health log");
        assert!(owner_view.is_ok());
    }

    fn user_with_id(id: Uuid) -> User {
        User { id, ..user(Role::Patient) }
    }

    #[test]
    fn test_doctor_assignment_rules() {
        let doctor = user(Role::Doctor);
        let mut patient = user(Role::Patient);

        let err = require_doctor_assignment(&doctor, Operation::ReadPatientLogs, Some(patient.clone())).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);

        patient.assigned_doctor_id = Some(doctor.id);
        assert!(require_doctor_assignment(&doctor, Operation::ReadPatientLogs, Some(patient)).is_ok());

        let err = require_doctor_assignment(&doctor, Operation::ReadPatientLogs, None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_doctor_target_must_be_a_patient() {
        let doctor = user(Role::Doctor);
        let mut other_doctor = user(Role::Doctor);
        other_doctor.assigned_doctor_id = Some(doctor.id);

        let err = require_doctor_assignment(&doctor, Operation::ReadPatientReports, Some(other_doctor)).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_patient_cannot_use_doctor_routes() {
        let patient = user(Role::Patient);
        let err = require_doctor_assignment(&patient, Operation::ReadPatientReports, None).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }
}
