use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::validation::RequestValidation;
use crate::{validate_email, validate_length, validate_required};

/// Minimum password length accepted at registration
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted user record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,

    // Patient fields
    pub blood_group: Option<String>,
    pub allergies: Vec<String>,
    pub chronic_conditions: Vec<String>,
    pub emergency_contact: Option<String>,
    pub assigned_doctor_id: Option<Uuid>,

    // Doctor fields
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub hospital_affiliation: Option<String>,
    pub patients_list: Vec<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    /// Build a fresh record; the store assigns nothing else
    pub fn new(email: String, hashed_password: String, full_name: String, phone: Option<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            hashed_password,
            full_name,
            phone,
            date_of_birth: None,
            gender: None,
            role,
            is_active: true,
            is_verified: false,
            blood_group: None,
            allergies: Vec::new(),
            chronic_conditions: Vec::new(),
            emergency_contact: None,
            assigned_doctor_id: None,
            specialization: None,
            license_number: None,
            hospital_affiliation: None,
            patients_list: Vec::new(),
            created_at: now,
            updated_at: now,
            last_login: None,
        }
    }
}

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub blood_group: Option<String>,
    pub allergies: Vec<String>,
    pub chronic_conditions: Vec<String>,
    pub emergency_contact: Option<String>,
    pub assigned_doctor_id: Option<Uuid>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub hospital_affiliation: Option<String>,
    pub patients_list: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            phone: user.phone.clone(),
            date_of_birth: user.date_of_birth,
            gender: user.gender.clone(),
            role: user.role,
            is_active: user.is_active,
            is_verified: user.is_verified,
            blood_group: user.blood_group.clone(),
            allergies: user.allergies.clone(),
            chronic_conditions: user.chronic_conditions.clone(),
            emergency_contact: user.emergency_contact.clone(),
            assigned_doctor_id: user.assigned_doctor_id,
            specialization: user.specialization.clone(),
            license_number: user.license_number.clone(),
            hospital_affiliation: user.hospital_affiliation.clone(),
            patients_list: user.patients_list.clone(),
            created_at: user.created_at,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
}

impl RegisterRequest {
    pub fn role(&self) -> Role {
        self.role.unwrap_or(Role::Patient)
    }

    /// Emails are compared case-insensitively
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_ascii_lowercase()
    }
}

impl RequestValidation for RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        validate_email!(self.email.trim(), "Invalid email format");
        validate_required!(self.full_name, "Full name is required");
        validate_length!(self.full_name, 1, 200, "Full name must be at most 200 characters");
        validate_length!(
            self.password,
            MIN_PASSWORD_LENGTH,
            256,
            "Password must be between 8 and 256 characters"
        );
        if self.role == Some(Role::Admin) {
            return Err(ApiError::validation("Admin accounts cannot be self-registered"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Token pair returned by register, login and refresh
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    pub user: UserProfile,
}

/// Self-service profile update; only present fields change
///
/// Email, role, activation and the doctor relationship are not part of the
/// payload, so any attempt to send them is rejected as an unknown field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub chronic_conditions: Option<Vec<String>>,
    pub emergency_contact: Option<String>,
    pub specialization: Option<String>,
    pub license_number: Option<String>,
    pub hospital_affiliation: Option<String>,
}

impl RequestValidation for UserUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(full_name) = &self.full_name {
            validate_required!(full_name, "Full name cannot be empty");
            validate_length!(full_name, 1, 200, "Full name must be at most 200 characters");
        }
        Ok(())
    }
}

impl UserUpdate {
    pub fn apply(self, user: &mut User) {
        if let Some(full_name) = self.full_name {
            user.full_name = full_name;
        }
        if let Some(phone) = self.phone {
            user.phone = Some(phone);
        }
        if let Some(date_of_birth) = self.date_of_birth {
            user.date_of_birth = Some(date_of_birth);
        }
        if let Some(gender) = self.gender {
            user.gender = Some(gender);
        }
        if let Some(blood_group) = self.blood_group {
            user.blood_group = Some(blood_group);
        }
        if let Some(allergies) = self.allergies {
            user.allergies = allergies;
        }
        if let Some(chronic_conditions) = self.chronic_conditions {
            user.chronic_conditions = chronic_conditions;
        }
        if let Some(emergency_contact) = self.emergency_contact {
            user.emergency_contact = Some(emergency_contact);
        }
        if let Some(specialization) = self.specialization {
            user.specialization = Some(specialization);
        }
        if let Some(license_number) = self.license_number {
            user.license_number = Some(license_number);
        }
        if let Some(hospital_affiliation) = self.hospital_affiliation {
            user.hospital_affiliation = Some(hospital_affiliation);
        }
        user.updated_at = Utc::now();
    }
}

/// Admin request linking a patient to a doctor
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct AssignmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(role: Option<Role>) -> RegisterRequest {
        RegisterRequest {
            email: "Jane@Example.com ".to_string(),
            password: "correct horse".to_string(),
            full_name: "Jane Doe".to_string(),
            phone: None,
            role,
        }
    }

    #[test]
    fn test_register_defaults_to_patient() {
        assert_eq!(register(None).role(), Role::Patient);
        assert_eq!(register(None).normalized_email(), "jane@example.com");
    }

    #[test]
    fn test_register_rejects_admin_role() {
        assert!(register(Some(Role::Admin)).validate().is_err());
        assert!(register(Some(Role::Doctor)).validate().is_ok());
    }

    #[test]
    fn test_register_rejects_short_password() {
        let request = RegisterRequest {
            password: "short".to_string(),
            ..register(None)
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_update_rejects_role_field() {
        let result: Result<UserUpdate, _> = serde_json::from_str(r#"{"role": "admin"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_touches_only_present_fields() {
        let mut user = User::new(
            "a@b.io".to_string(),
            "hash".to_string(),
            "Before".to_string(),
            Some("555".to_string()),
            Role::Patient,
        );
        let update: UserUpdate = serde_json::from_str(r#"{"full_name": "After"}"#).unwrap();
        update.apply(&mut user);

        assert_eq!(user.full_name, "After");
        assert_eq!(user.phone.as_deref(), Some("555"));
    }

    #[test]
    fn test_password_hash_never_serialized() {
        let user = User::new("a@b.io".into(), "secret-hash".into(), "A".into(), None, Role::Doctor);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
