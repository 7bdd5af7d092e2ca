use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::validation::RequestValidation;
use crate::{validate_optional_range, validate_range};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "symptom_severity", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    None,
    Mild,
    Moderate,
    Severe,
    Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "mood_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Excellent,
    Good,
    #[default]
    Okay,
    Low,
    Depressed,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Excellent => "excellent",
            Mood::Good => "good",
            Mood::Okay => "okay",
            Mood::Low => "low",
            Mood::Depressed => "depressed",
        }
    }
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::None => "none",
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
            Severity::Critical => "critical",
        }
    }
}

/// Daily symptom and vitals snapshot
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct HealthLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub log_date: DateTime<Utc>,

    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,

    /// Celsius
    pub temperature: Option<f64>,
    pub blood_pressure_systolic: Option<i32>,
    pub blood_pressure_diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub oxygen_saturation: Option<f64>,
    /// Kilograms
    pub weight: Option<f64>,
    /// mg/dL
    pub blood_sugar: Option<f64>,

    pub has_fever: bool,
    pub has_cough: bool,
    pub has_headache: bool,
    pub has_fatigue: bool,
    pub has_body_pain: bool,
    pub has_nausea: bool,

    pub pain_level: Severity,
    pub symptom_severity: Severity,

    pub mood: Mood,
    pub stress_level: i32,
    pub anxiety_level: i32,

    pub sleep_hours: Option<f64>,
    pub sleep_quality: i32,
    /// Litres
    pub water_intake: Option<f64>,
    pub exercise_minutes: Option<i32>,

    pub medications_taken: Vec<String>,
    pub notes: Option<String>,
    pub symptoms_description: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HealthLog {
    /// Names of the symptom flags that are set
    pub fn active_symptoms(&self) -> Vec<&'static str> {
        [
            (self.has_fever, "fever"),
            (self.has_cough, "cough"),
            (self.has_headache, "headache"),
            (self.has_fatigue, "fatigue"),
            (self.has_body_pain, "body pain"),
            (self.has_nausea, "nausea"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }

    pub fn blood_pressure(&self) -> Option<String> {
        match (self.blood_pressure_systolic, self.blood_pressure_diastolic) {
            (Some(systolic), Some(diastolic)) => Some(format!("{systolic}/{diastolic}")),
            _ => None,
        }
    }
}

fn default_scale() -> i32 {
    5
}

/// Create payload; the owner comes from the caller, never the body
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct HealthLogCreate {
    #[serde(default)]
    pub log_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub patient_name: Option<String>,
    #[serde(default)]
    pub doctor_name: Option<String>,

    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub blood_pressure_systolic: Option<i32>,
    #[serde(default)]
    pub blood_pressure_diastolic: Option<i32>,
    #[serde(default)]
    pub heart_rate: Option<i32>,
    #[serde(default)]
    pub oxygen_saturation: Option<f64>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub blood_sugar: Option<f64>,

    #[serde(default)]
    pub has_fever: bool,
    #[serde(default)]
    pub has_cough: bool,
    #[serde(default)]
    pub has_headache: bool,
    #[serde(default)]
    pub has_fatigue: bool,
    #[serde(default)]
    pub has_body_pain: bool,
    #[serde(default)]
    pub has_nausea: bool,

    #[serde(default)]
    pub pain_level: Severity,
    #[serde(default)]
    pub symptom_severity: Severity,

    #[serde(default)]
    pub mood: Mood,
    #[serde(default = "default_scale")]
    pub stress_level: i32,
    #[serde(default = "default_scale")]
    pub anxiety_level: i32,

    #[serde(default)]
    pub sleep_hours: Option<f64>,
    #[serde(default = "default_scale")]
    pub sleep_quality: i32,
    #[serde(default)]
    pub water_intake: Option<f64>,
    #[serde(default)]
    pub exercise_minutes: Option<i32>,

    #[serde(default)]
    pub medications_taken: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub symptoms_description: Option<String>,
}

impl RequestValidation for HealthLogCreate {
    fn validate(&self) -> Result<(), ApiError> {
        validate_vitals(&Vitals {
            temperature: self.temperature,
            blood_pressure_systolic: self.blood_pressure_systolic,
            blood_pressure_diastolic: self.blood_pressure_diastolic,
            heart_rate: self.heart_rate,
            oxygen_saturation: self.oxygen_saturation,
            weight: self.weight,
            blood_sugar: self.blood_sugar,
            sleep_hours: self.sleep_hours,
            water_intake: self.water_intake,
            exercise_minutes: self.exercise_minutes,
        })?;
        validate_range!(self.stress_level, 1, 10, "stress_level must be between 1 and 10");
        validate_range!(self.anxiety_level, 1, 10, "anxiety_level must be between 1 and 10");
        validate_range!(self.sleep_quality, 1, 10, "sleep_quality must be between 1 and 10");
        Ok(())
    }
}

impl HealthLogCreate {
    pub fn into_log(self, user_id: Uuid) -> HealthLog {
        let now = Utc::now();
        HealthLog {
            id: Uuid::new_v4(),
            user_id,
            log_date: self.log_date.unwrap_or(now),
            patient_name: self.patient_name,
            doctor_name: self.doctor_name,
            temperature: self.temperature,
            blood_pressure_systolic: self.blood_pressure_systolic,
            blood_pressure_diastolic: self.blood_pressure_diastolic,
            heart_rate: self.heart_rate,
            oxygen_saturation: self.oxygen_saturation,
            weight: self.weight,
            blood_sugar: self.blood_sugar,
            has_fever: self.has_fever,
            has_cough: self.has_cough,
            has_headache: self.has_headache,
            has_fatigue: self.has_fatigue,
            has_body_pain: self.has_body_pain,
            has_nausea: self.has_nausea,
            pain_level: self.pain_level,
            symptom_severity: self.symptom_severity,
            mood: self.mood,
            stress_level: self.stress_level,
            anxiety_level: self.anxiety_level,
            sleep_hours: self.sleep_hours,
            sleep_quality: self.sleep_quality,
            water_intake: self.water_intake,
            exercise_minutes: self.exercise_minutes,
            medications_taken: self.medications_taken,
            notes: self.notes,
            symptoms_description: self.symptoms_description,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; absent (or null) fields keep their stored value
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct HealthLogUpdate {
    pub log_date: Option<DateTime<Utc>>,
    pub patient_name: Option<String>,
    pub doctor_name: Option<String>,
    pub temperature: Option<f64>,
    pub blood_pressure_systolic: Option<i32>,
    pub blood_pressure_diastolic: Option<i32>,
    pub heart_rate: Option<i32>,
    pub oxygen_saturation: Option<f64>,
    pub weight: Option<f64>,
    pub blood_sugar: Option<f64>,
    pub has_fever: Option<bool>,
    pub has_cough: Option<bool>,
    pub has_headache: Option<bool>,
    pub has_fatigue: Option<bool>,
    pub has_body_pain: Option<bool>,
    pub has_nausea: Option<bool>,
    pub pain_level: Option<Severity>,
    pub symptom_severity: Option<Severity>,
    pub mood: Option<Mood>,
    pub stress_level: Option<i32>,
    pub anxiety_level: Option<i32>,
    pub sleep_hours: Option<f64>,
    pub sleep_quality: Option<i32>,
    pub water_intake: Option<f64>,
    pub exercise_minutes: Option<i32>,
    pub medications_taken: Option<Vec<String>>,
    pub notes: Option<String>,
    pub symptoms_description: Option<String>,
}

impl RequestValidation for HealthLogUpdate {
    fn validate(&self) -> Result<(), ApiError> {
        validate_vitals(&Vitals {
            temperature: self.temperature,
            blood_pressure_systolic: self.blood_pressure_systolic,
            blood_pressure_diastolic: self.blood_pressure_diastolic,
            heart_rate: self.heart_rate,
            oxygen_saturation: self.oxygen_saturation,
            weight: self.weight,
            blood_sugar: self.blood_sugar,
            sleep_hours: self.sleep_hours,
            water_intake: self.water_intake,
            exercise_minutes: self.exercise_minutes,
        })?;
        validate_optional_range!(self.stress_level, 1, 10, "stress_level must be between 1 and 10");
        validate_optional_range!(self.anxiety_level, 1, 10, "anxiety_level must be between 1 and 10");
        validate_optional_range!(self.sleep_quality, 1, 10, "sleep_quality must be between 1 and 10");
        Ok(())
    }
}

macro_rules! merge {
    ($update:ident, $log:ident, value: [$($field:ident),* $(,)?], optional: [$($opt:ident),* $(,)?]) => {
        $(
            if let Some(value) = $update.$field {
                $log.$field = value;
            }
        )*
        $(
            if let Some(value) = $update.$opt {
                $log.$opt = Some(value);
            }
        )*
    };
}

impl HealthLogUpdate {
    pub fn apply(self, log: &mut HealthLog) {
        let update = self;
        merge!(
            update,
            log,
            value: [
                log_date,
                has_fever,
                has_cough,
                has_headache,
                has_fatigue,
                has_body_pain,
                has_nausea,
                pain_level,
                symptom_severity,
                mood,
                stress_level,
                anxiety_level,
                sleep_quality,
                medications_taken,
            ],
            optional: [
                patient_name,
                doctor_name,
                temperature,
                blood_pressure_systolic,
                blood_pressure_diastolic,
                heart_rate,
                oxygen_saturation,
                weight,
                blood_sugar,
                sleep_hours,
                water_intake,
                exercise_minutes,
                notes,
                symptoms_description,
            ]
        );
        log.updated_at = Utc::now();
    }
}

struct Vitals {
    temperature: Option<f64>,
    blood_pressure_systolic: Option<i32>,
    blood_pressure_diastolic: Option<i32>,
    heart_rate: Option<i32>,
    oxygen_saturation: Option<f64>,
    weight: Option<f64>,
    blood_sugar: Option<f64>,
    sleep_hours: Option<f64>,
    water_intake: Option<f64>,
    exercise_minutes: Option<i32>,
}

fn validate_vitals(vitals: &Vitals) -> Result<(), ApiError> {
    validate_optional_range!(vitals.temperature, 35.0, 45.0, "temperature must be between 35 and 45");
    validate_optional_range!(
        vitals.blood_pressure_systolic,
        50,
        250,
        "blood_pressure_systolic must be between 50 and 250"
    );
    validate_optional_range!(
        vitals.blood_pressure_diastolic,
        30,
        150,
        "blood_pressure_diastolic must be between 30 and 150"
    );
    validate_optional_range!(vitals.heart_rate, 30, 220, "heart_rate must be between 30 and 220");
    validate_optional_range!(
        vitals.oxygen_saturation,
        0.0,
        100.0,
        "oxygen_saturation must be between 0 and 100"
    );
    validate_optional_range!(vitals.weight, 10.0, 300.0, "weight must be between 10 and 300");
    validate_optional_range!(vitals.blood_sugar, 0.0, 600.0, "blood_sugar must be between 0 and 600");
    validate_optional_range!(vitals.sleep_hours, 0.0, 24.0, "sleep_hours must be between 0 and 24");
    validate_optional_range!(vitals.water_intake, 0.0, 20.0, "water_intake must be between 0 and 20");
    validate_optional_range!(
        vitals.exercise_minutes,
        0,
        1440,
        "exercise_minutes must be between 0 and 1440"
    );
    Ok(())
}
