use chrono::{DateTime, Utc};
use crypto::FieldCipher;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::file_storage::StoredFile;
use crate::validation::RequestValidation;
use crate::{validate_length, validate_required};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "report_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    LabTest,
    Prescription,
    Xray,
    Mri,
    CtScan,
    Ultrasound,
    MedicalCertificate,
    Vaccination,
    Other,
}

impl ReportType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportType::LabTest => "lab_test",
            ReportType::Prescription => "prescription",
            ReportType::Xray => "xray",
            ReportType::Mri => "mri",
            ReportType::CtScan => "ct_scan",
            ReportType::Ultrasound => "ultrasound",
            ReportType::MedicalCertificate => "medical_certificate",
            ReportType::Vaccination => "vaccination",
            ReportType::Other => "other",
        }
    }
}

impl std::str::FromStr for ReportType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.trim().to_string()))
            .map_err(|_| ApiError::validation(format!("Unknown report type: {s}")))
    }
}

/// Uploaded document plus manually entered medical metadata
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HealthReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub uploaded_by: Uuid,

    pub report_type: ReportType,
    pub title: String,
    pub description: Option<String>,
    pub report_date: DateTime<Utc>,

    /// Set once at upload
    pub file_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub file_type: String,

    pub doctor_name: Option<String>,
    pub hospital_name: Option<String>,
    pub diagnosis: Option<String>,
    pub medications: Vec<String>,
    #[schema(value_type = Option<Object>)]
    pub test_results: Option<Value>,

    /// Stored for compatibility; no endpoint writes it and no access check reads it
    pub shared_with_doctors: Vec<Uuid>,
    pub is_sensitive: bool,
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HealthReport {
    pub fn new(owner: Uuid, metadata: ReportUpload, file: StoredFile) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: owner,
            uploaded_by: owner,
            report_type: metadata.report_type,
            title: metadata.title,
            description: metadata.description,
            report_date: metadata.report_date.unwrap_or(now),
            file_path: file.path,
            file_name: file.original_name,
            file_size: file.size,
            file_type: file.extension,
            doctor_name: metadata.doctor_name,
            hospital_name: metadata.hospital_name,
            diagnosis: metadata.diagnosis,
            medications: Vec::new(),
            test_results: None,
            shared_with_doctors: Vec::new(),
            is_sensitive: metadata.is_sensitive,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Encrypt the sensitive fields before the record is written
    pub fn seal(mut self, cipher: Option<&FieldCipher>) -> Result<Self, ApiError> {
        let Some(cipher) = cipher else {
            return Ok(self);
        };
        if let Some(diagnosis) = self.diagnosis.take() {
            self.diagnosis = Some(cipher.seal_str(&diagnosis)?);
        }
        if let Some(results) = self.test_results.take() {
            self.test_results = Some(cipher.seal_json(&results)?);
        }
        Ok(self)
    }

    /// Decrypt the sensitive fields after the record is read
    pub fn open(mut self, cipher: Option<&FieldCipher>) -> Result<Self, ApiError> {
        let Some(cipher) = cipher else {
            return Ok(self);
        };
        if let Some(diagnosis) = self.diagnosis.take() {
            self.diagnosis = Some(cipher.open_str(&diagnosis)?);
        }
        if let Some(results) = self.test_results.take() {
            self.test_results = Some(cipher.open_json(&results)?);
        }
        Ok(self)
    }
}

/// Text fields of the multipart upload form
#[derive(Debug, Clone)]
pub struct ReportUpload {
    pub report_type: ReportType,
    pub title: String,
    pub description: Option<String>,
    pub report_date: Option<DateTime<Utc>>,
    pub doctor_name: Option<String>,
    pub hospital_name: Option<String>,
    pub diagnosis: Option<String>,
    pub is_sensitive: bool,
}

impl RequestValidation for ReportUpload {
    fn validate(&self) -> Result<(), ApiError> {
        validate_required!(self.title, "title is required");
        validate_length!(self.title, 1, 300, "title must be at most 300 characters");
        Ok(())
    }
}

/// Metadata update; the stored file, owner and sharing list are not writable
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct ReportUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub report_type: Option<ReportType>,
    pub report_date: Option<DateTime<Utc>>,
    pub doctor_name: Option<String>,
    pub hospital_name: Option<String>,
    pub diagnosis: Option<String>,
    pub medications: Option<Vec<String>>,
    #[schema(value_type = Option<Object>)]
    pub test_results: Option<Value>,
    pub is_sensitive: Option<bool>,
    pub tags: Option<Vec<String>>,
}

impl RequestValidation for ReportUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        if let Some(title) = &self.title {
            validate_required!(title, "title cannot be empty");
            validate_length!(title, 1, 300, "title must be at most 300 characters");
        }
        if let Some(results) = &self.test_results {
            if !results.is_object() {
                return Err(ApiError::validation("test_results must be a JSON object"));
            }
        }
        Ok(())
    }
}

impl ReportUpdate {
    pub fn apply(self, report: &mut HealthReport) {
        if let Some(title) = self.title {
            report.title = title;
        }
        if let Some(description) = self.description {
            report.description = Some(description);
        }
        if let Some(report_type) = self.report_type {
            report.report_type = report_type;
        }
        if let Some(report_date) = self.report_date {
            report.report_date = report_date;
        }
        if let Some(doctor_name) = self.doctor_name {
            report.doctor_name = Some(doctor_name);
        }
        if let Some(hospital_name) = self.hospital_name {
            report.hospital_name = Some(hospital_name);
        }
        if let Some(diagnosis) = self.diagnosis {
            report.diagnosis = Some(diagnosis);
        }
        if let Some(medications) = self.medications {
            report.medications = medications;
        }
        if let Some(test_results) = self.test_results {
            report.test_results = Some(test_results);
        }
        if let Some(is_sensitive) = self.is_sensitive {
            report.is_sensitive = is_sensitive;
        }
        if let Some(tags) = self.tags {
            report.tags = tags;
        }
        report.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report() -> HealthReport {
        HealthReport::new(
            Uuid::new_v4(),
            ReportUpload {
                report_type: ReportType::LabTest,
                title: "Blood panel".to_string(),
                description: None,
                report_date: None,
                doctor_name: None,
                hospital_name: None,
                diagnosis: Some("Iron deficiency".to_string()),
                is_sensitive: false,
            },
            StoredFile {
                path: "uploads/x.pdf".to_string(),
                original_name: "panel.pdf".to_string(),
                size: 42,
                extension: "pdf".to_string(),
            },
        )
    }

    #[test]
    fn test_report_type_parses_snake_case() {
        assert_eq!("ct_scan".parse::<ReportType>().unwrap(), ReportType::CtScan);
        assert!("brain_scan".parse::<ReportType>().is_err());
    }

    #[test]
    fn test_update_cannot_touch_file_or_sharing() {
        for field in ["file_path", "shared_with_doctors", "user_id"] {
            let body = format!(r#"{{"{field}": "x"}}"#);
            assert!(serde_json::from_str::<ReportUpdate>(&body).is_err(), "{field} accepted");
        }
    }

    #[test]
    fn test_update_merges_present_fields() {
        let mut report = report();
        let update: ReportUpdate = serde_json::from_value(json!({"title": "Iron panel", "tags": ["a"]})).unwrap();
        update.apply(&mut report);

        assert_eq!(report.title, "Iron panel");
        assert_eq!(report.tags, vec!["a"]);
        assert_eq!(report.file_path, "uploads/x.pdf");
    }

    #[test]
    fn test_seal_and_open_sensitive_fields() {
        let cipher = FieldCipher::new(FieldCipher::generate_key()).unwrap();
        let mut report = report();
        report.test_results = Some(json!({"Hemoglobin": "14.5 g/dL"}));

        let sealed = report.clone().seal(Some(&cipher)).unwrap();
        assert!(FieldCipher::is_sealed(sealed.diagnosis.as_deref().unwrap()));
        assert_ne!(sealed.test_results, report.test_results);

        let opened = sealed.open(Some(&cipher)).unwrap();
        assert_eq!(opened.diagnosis, report.diagnosis);
        assert_eq!(opened.test_results, report.test_results);
    }

    #[test]
    fn test_without_cipher_fields_pass_through() {
        let report = report();
        let stored = report.clone().seal(None).unwrap();
        assert_eq!(stored.diagnosis, report.diagnosis);
    }
}
