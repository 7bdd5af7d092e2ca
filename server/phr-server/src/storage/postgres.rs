//! Postgres-backed stores
//!
//! The pool is created once in `main` and cloned into each store.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    HealthLogStore, InsightStore, LogFilter, ReportStore, StoreError, StoreResult, UserStore,
};
use crate::models::{HealthInsight, HealthLog, HealthReport, ReportType, Role, User};
use crate::types::Page;

/// Embedded schema migrations
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

fn conflict_on_unique(err: sqlx::Error, message: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Conflict(message.to_string()),
        _ => StoreError::Database(err),
    }
}

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (
                id, email, hashed_password, full_name, phone, date_of_birth, gender,
                role, is_active, is_verified, blood_group, allergies, chronic_conditions,
                emergency_contact, assigned_doctor_id, specialization, license_number,
                hospital_affiliation, patients_list, created_at, updated_at, last_login
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22
            )
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.hashed_password)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.date_of_birth)
        .bind(&user.gender)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.is_verified)
        .bind(&user.blood_group)
        .bind(&user.allergies)
        .bind(&user.chronic_conditions)
        .bind(&user.emergency_contact)
        .bind(user.assigned_doctor_id)
        .bind(&user.specialization)
        .bind(&user.license_number)
        .bind(&user.hospital_affiliation)
        .bind(&user.patients_list)
        .bind(user.created_at)
        .bind(user.updated_at)
        .bind(user.last_login)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Email already registered"))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update(&self, user: &User) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                full_name = $2, phone = $3, date_of_birth = $4, gender = $5,
                is_active = $6, is_verified = $7, blood_group = $8, allergies = $9,
                chronic_conditions = $10, emergency_contact = $11, assigned_doctor_id = $12,
                specialization = $13, license_number = $14, hospital_affiliation = $15,
                patients_list = $16, updated_at = $17, last_login = $18
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user.id)
        .bind(&user.full_name)
        .bind(&user.phone)
        .bind(user.date_of_birth)
        .bind(&user.gender)
        .bind(user.is_active)
        .bind(user.is_verified)
        .bind(&user.blood_group)
        .bind(&user.allergies)
        .bind(&user.chronic_conditions)
        .bind(&user.emergency_contact)
        .bind(user.assigned_doctor_id)
        .bind(&user.specialization)
        .bind(&user.license_number)
        .bind(&user.hospital_affiliation)
        .bind(&user.patients_list)
        .bind(user.updated_at)
        .bind(user.last_login)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("User".to_string()))
    }

    async fn list(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE ($1::user_role IS NULL OR role = $1)
            ORDER BY created_at DESC
            OFFSET $2 LIMIT $3
            "#,
        )
        .bind(role)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn list_assigned_patients(&self, doctor_id: Uuid) -> StoreResult<Vec<User>> {
        let patients = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE role = 'patient' AND assigned_doctor_id = $1
            ORDER BY full_name
            "#,
        )
        .bind(doctor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(patients)
    }

    async fn count(&self) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

pub struct PgHealthLogStore {
    pool: PgPool,
}

impl PgHealthLogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthLogStore for PgHealthLogStore {
    async fn create(&self, log: HealthLog) -> StoreResult<HealthLog> {
        let log = sqlx::query_as::<_, HealthLog>(
            r#"
            INSERT INTO health_logs (
                id, user_id, log_date, patient_name, doctor_name,
                temperature, blood_pressure_systolic, blood_pressure_diastolic, heart_rate,
                oxygen_saturation, weight, blood_sugar,
                has_fever, has_cough, has_headache, has_fatigue, has_body_pain, has_nausea,
                pain_level, symptom_severity, mood, stress_level, anxiety_level,
                sleep_hours, sleep_quality, water_intake, exercise_minutes,
                medications_taken, notes, symptoms_description, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
                $31, $32
            )
            RETURNING *
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.log_date)
        .bind(&log.patient_name)
        .bind(&log.doctor_name)
        .bind(log.temperature)
        .bind(log.blood_pressure_systolic)
        .bind(log.blood_pressure_diastolic)
        .bind(log.heart_rate)
        .bind(log.oxygen_saturation)
        .bind(log.weight)
        .bind(log.blood_sugar)
        .bind(log.has_fever)
        .bind(log.has_cough)
        .bind(log.has_headache)
        .bind(log.has_fatigue)
        .bind(log.has_body_pain)
        .bind(log.has_nausea)
        .bind(log.pain_level)
        .bind(log.symptom_severity)
        .bind(log.mood)
        .bind(log.stress_level)
        .bind(log.anxiety_level)
        .bind(log.sleep_hours)
        .bind(log.sleep_quality)
        .bind(log.water_intake)
        .bind(log.exercise_minutes)
        .bind(&log.medications_taken)
        .bind(&log.notes)
        .bind(&log.symptoms_description)
        .bind(log.created_at)
        .bind(log.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(log)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthLog>> {
        let log = sqlx::query_as::<_, HealthLog>("SELECT * FROM health_logs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(log)
    }

    async fn list(&self, user_id: Uuid, filter: LogFilter, page: Page) -> StoreResult<Vec<HealthLog>> {
        let logs = sqlx::query_as::<_, HealthLog>(
            r#"
            SELECT * FROM health_logs
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR log_date >= $2)
              AND ($3::timestamptz IS NULL OR log_date <= $3)
            ORDER BY log_date DESC
            OFFSET $4 LIMIT $5
            "#,
        )
        .bind(user_id)
        .bind(filter.start_date)
        .bind(filter.end_date)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn list_with_sleep(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<HealthLog>> {
        let logs = sqlx::query_as::<_, HealthLog>(
            r#"
            SELECT * FROM health_logs
            WHERE user_id = $1 AND sleep_hours IS NOT NULL
            ORDER BY log_date DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    async fn update(&self, log: &HealthLog) -> StoreResult<HealthLog> {
        sqlx::query_as::<_, HealthLog>(
            r#"
            UPDATE health_logs SET
                log_date = $2, patient_name = $3, doctor_name = $4, temperature = $5,
                blood_pressure_systolic = $6, blood_pressure_diastolic = $7, heart_rate = $8,
                oxygen_saturation = $9, weight = $10, blood_sugar = $11,
                has_fever = $12, has_cough = $13, has_headache = $14, has_fatigue = $15,
                has_body_pain = $16, has_nausea = $17, pain_level = $18, symptom_severity = $19,
                mood = $20, stress_level = $21, anxiety_level = $22, sleep_hours = $23,
                sleep_quality = $24, water_intake = $25, exercise_minutes = $26,
                medications_taken = $27, notes = $28, symptoms_description = $29,
                updated_at = $30
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(log.id)
        .bind(log.log_date)
        .bind(&log.patient_name)
        .bind(&log.doctor_name)
        .bind(log.temperature)
        .bind(log.blood_pressure_systolic)
        .bind(log.blood_pressure_diastolic)
        .bind(log.heart_rate)
        .bind(log.oxygen_saturation)
        .bind(log.weight)
        .bind(log.blood_sugar)
        .bind(log.has_fever)
        .bind(log.has_cough)
        .bind(log.has_headache)
        .bind(log.has_fatigue)
        .bind(log.has_body_pain)
        .bind(log.has_nausea)
        .bind(log.pain_level)
        .bind(log.symptom_severity)
        .bind(log.mood)
        .bind(log.stress_level)
        .bind(log.anxiety_level)
        .bind(log.sleep_hours)
        .bind(log.sleep_quality)
        .bind(log.water_intake)
        .bind(log.exercise_minutes)
        .bind(&log.medications_taken)
        .bind(&log.notes)
        .bind(&log.symptoms_description)
        .bind(log.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("Health log".to_string()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM health_logs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM health_logs")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn create(&self, report: HealthReport) -> StoreResult<HealthReport> {
        let report = sqlx::query_as::<_, HealthReport>(
            r#"
            INSERT INTO health_reports (
                id, user_id, uploaded_by, report_type, title, description, report_date,
                file_path, file_name, file_size, file_type, doctor_name, hospital_name,
                diagnosis, medications, test_results, shared_with_doctors, is_sensitive,
                tags, created_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                $17, $18, $19, $20, $21
            )
            RETURNING *
            "#,
        )
        .bind(report.id)
        .bind(report.user_id)
        .bind(report.uploaded_by)
        .bind(report.report_type)
        .bind(&report.title)
        .bind(&report.description)
        .bind(report.report_date)
        .bind(&report.file_path)
        .bind(&report.file_name)
        .bind(report.file_size)
        .bind(&report.file_type)
        .bind(&report.doctor_name)
        .bind(&report.hospital_name)
        .bind(&report.diagnosis)
        .bind(&report.medications)
        .bind(&report.test_results)
        .bind(&report.shared_with_doctors)
        .bind(report.is_sensitive)
        .bind(&report.tags)
        .bind(report.created_at)
        .bind(report.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(report)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthReport>> {
        let report = sqlx::query_as::<_, HealthReport>("SELECT * FROM health_reports WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(report)
    }

    async fn list(
        &self,
        user_id: Uuid,
        report_type: Option<ReportType>,
        page: Page,
    ) -> StoreResult<Vec<HealthReport>> {
        let reports = sqlx::query_as::<_, HealthReport>(
            r#"
            SELECT * FROM health_reports
            WHERE user_id = $1 AND ($2::report_type IS NULL OR report_type = $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(report_type)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }

    async fn list_by_report_date(&self, user_id: Uuid) -> StoreResult<Vec<HealthReport>> {
        let reports = sqlx::query_as::<_, HealthReport>(
            "SELECT * FROM health_reports WHERE user_id = $1 ORDER BY report_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reports)
    }

    async fn update(&self, report: &HealthReport) -> StoreResult<HealthReport> {
        sqlx::query_as::<_, HealthReport>(
            r#"
            UPDATE health_reports SET
                report_type = $2, title = $3, description = $4, report_date = $5,
                doctor_name = $6, hospital_name = $7, diagnosis = $8, medications = $9,
                test_results = $10, is_sensitive = $11, tags = $12, updated_at = $13
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(report.id)
        .bind(report.report_type)
        .bind(&report.title)
        .bind(&report.description)
        .bind(report.report_date)
        .bind(&report.doctor_name)
        .bind(&report.hospital_name)
        .bind(&report.diagnosis)
        .bind(&report.medications)
        .bind(&report.test_results)
        .bind(report.is_sensitive)
        .bind(&report.tags)
        .bind(report.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound("Health report".to_string()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM health_reports WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> StoreResult<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM health_reports")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

pub struct PgInsightStore {
    pool: PgPool,
}

impl PgInsightStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InsightStore for PgInsightStore {
    async fn create(&self, insight: HealthInsight) -> StoreResult<HealthInsight> {
        let insight = sqlx::query_as::<_, HealthInsight>(
            r#"
            INSERT INTO health_insights (
                id, user_id, patient_name, analyzed_log_ids, logs_analyzed_count,
                trends, correlations, recommendations, alerts, insights_raw,
                analysis_date, data_points_analyzed, ai_model_used, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING *
            "#,
        )
        .bind(insight.id)
        .bind(insight.user_id)
        .bind(&insight.patient_name)
        .bind(&insight.analyzed_log_ids)
        .bind(insight.logs_analyzed_count)
        .bind(&insight.trends)
        .bind(&insight.correlations)
        .bind(&insight.recommendations)
        .bind(&insight.alerts)
        .bind(&insight.insights_raw)
        .bind(insight.analysis_date)
        .bind(insight.data_points_analyzed)
        .bind(&insight.ai_model_used)
        .bind(insight.created_at)
        .bind(insight.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(insight)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthInsight>> {
        let insight = sqlx::query_as::<_, HealthInsight>("SELECT * FROM health_insights WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(insight)
    }

    async fn list(&self, user_id: Uuid) -> StoreResult<Vec<HealthInsight>> {
        let insights = sqlx::query_as::<_, HealthInsight>(
            "SELECT * FROM health_insights WHERE user_id = $1 ORDER BY analysis_date DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(insights)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM health_insights WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
