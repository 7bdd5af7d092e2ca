use axum::{
    extract::{
        multipart::{Field, MultipartRejection},
        Multipart, Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{require_ownership, require_role, CurrentUser, Operation};
use crate::error::{api_success, api_success_with_meta, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::models::{HealthReport, ReportType, ReportUpdate, ReportUpload};
use crate::server::PhrServer;
use crate::services::pdf::{render_health_summary, EXPORT_LOG_WINDOW};
use crate::storage::LogFilter;
use crate::types::pagination::{Page, SkipLimit, DEFAULT_REPORT_LIMIT};
use crate::validation::{ApiJson, RequestValidation};

#[derive(Debug, Deserialize, IntoParams, Default)]
pub struct ReportListQuery {
    pub report_type: Option<ReportType>,
    #[param(minimum = 0)]
    pub skip: Option<i64>,
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
}

/// Multipart upload form, documented for OpenAPI only
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ReportUploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    pub report_type: ReportType,
    pub title: String,
    pub description: Option<String>,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    pub report_date: Option<String>,
    pub doctor_name: Option<String>,
    pub hospital_name: Option<String>,
    pub diagnosis: Option<String>,
    pub is_sensitive: Option<bool>,
}

#[derive(Default)]
struct UploadForm {
    file: Option<(String, Vec<u8>)>,
    report_type: Option<String>,
    title: Option<String>,
    description: Option<String>,
    report_date: Option<String>,
    doctor_name: Option<String>,
    hospital_name: Option<String>,
    diagnosis: Option<String>,
    is_sensitive: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_report_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ApiError::validation("report_date must be RFC 3339 or YYYY-MM-DD"))
}

async fn text(field: Field<'_>) -> Result<String, ApiError> {
    Ok(field.text().await?)
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "file" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    form.file = Some((file_name, bytes.to_vec()));
                }
                "report_type" => form.report_type = Some(text(field).await?),
                "title" => form.title = Some(text(field).await?),
                "description" => form.description = Some(text(field).await?),
                "report_date" => form.report_date = Some(text(field).await?),
                "doctor_name" => form.doctor_name = Some(text(field).await?),
                "hospital_name" => form.hospital_name = Some(text(field).await?),
                "diagnosis" => form.diagnosis = Some(text(field).await?),
                "is_sensitive" => form.is_sensitive = Some(text(field).await?),
                other => return Err(ApiError::unprocessable(format!("Unknown form field: {other}"))),
            }
        }
        Ok(form)
    }

    fn into_parts(self) -> Result<(ReportUpload, String, Vec<u8>), ApiError> {
        let (file_name, content) = self
            .file
            .ok_or_else(|| ApiError::unprocessable("Missing form field: file"))?;
        let report_type = self
            .report_type
            .ok_or_else(|| ApiError::unprocessable("Missing form field: report_type"))?
            .parse::<ReportType>()?;
        let title = self
            .title
            .ok_or_else(|| ApiError::unprocessable("Missing form field: title"))?;
        let report_date = non_empty(self.report_date)
            .map(|raw| parse_report_date(&raw))
            .transpose()?;
        let is_sensitive = match non_empty(self.is_sensitive) {
            None => false,
            Some(raw) => raw
                .parse::<bool>()
                .map_err(|_| ApiError::validation("is_sensitive must be true or false"))?,
        };

        let upload = ReportUpload {
            report_type,
            title: title.trim().to_string(),
            description: non_empty(self.description),
            report_date,
            doctor_name: non_empty(self.doctor_name),
            hospital_name: non_empty(self.hospital_name),
            diagnosis: non_empty(self.diagnosis),
            is_sensitive,
        };
        Ok((upload, file_name, content))
    }
}

/// Store a document and its metadata
///
/// The file is written first, then the metadata row; the pair is not atomic.
#[utoipa::path(
    post,
    path = crate::routes::paths::reports::UPLOAD,
    tag = "reports",
    security(("bearer_auth" = [])),
    request_body(content = ReportUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Report stored", body = HealthReport),
        (status = 400, description = "Disallowed extension, oversize file or bad metadata"),
        (status = 422, description = "Malformed multipart payload")
    )
)]
pub async fn upload_report(
    State(server): State<PhrServer>,
    current: CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<HealthReport>>), ApiError> {
    require_role(&current, Operation::UploadReport)?;

    let (upload, file_name, content) = UploadForm::read(multipart?).await?.into_parts()?;
    upload.validate()?;

    let stored = server.files.save(current.id, &file_name, &content).await?;
    let report = HealthReport::new(current.id, upload, stored).seal(server.cipher())?;
    let report = server.stores.reports.create(report).await?.open(server.cipher())?;

    tracing::info!(
        user_id = %current.id,
        report_id = %report.id,
        report_type = report.report_type.as_str(),
        size = report.file_size,
        "Report uploaded"
    );

    Ok((StatusCode::CREATED, Json(api_success(report))))
}

/// Caller's reports, newest upload first
#[utoipa::path(
    get,
    path = crate::routes::paths::reports::REPORTS,
    tag = "reports",
    security(("bearer_auth" = [])),
    params(ReportListQuery),
    responses((status = 200, description = "Reports", body = Vec<HealthReport>))
)]
pub async fn list_reports(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Query(query): Query<ReportListQuery>,
) -> Result<Json<ApiResponse<Vec<HealthReport>>>, ApiError> {
    require_role(&current, Operation::ListReports)?;

    let page = SkipLimit {
        skip: query.skip,
        limit: query.limit,
    }
    .page(DEFAULT_REPORT_LIMIT);
    let reports = server
        .stores
        .reports
        .list(current.id, query.report_type, page)
        .await?
        .into_iter()
        .map(|report| report.open(server.cipher()))
        .collect::<Result<Vec<_>, _>>()?;
    let metadata = page.to_metadata(reports.len());

    Ok(Json(api_success_with_meta(reports, metadata)))
}

/// Caller's health summary as a PDF attachment
#[utoipa::path(
    get,
    path = crate::routes::paths::reports::EXPORT_SUMMARY,
    tag = "reports",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "PDF document", content_type = "application/pdf", body = Vec<u8>))
)]
pub async fn export_summary(
    State(server): State<PhrServer>,
    current: CurrentUser,
) -> Result<Response, ApiError> {
    require_role(&current, Operation::ExportSummary)?;

    let reports = server.stores.reports.list_by_report_date(current.id).await?;
    let logs = server
        .stores
        .logs
        .list(current.id, LogFilter::default(), Page::first(EXPORT_LOG_WINDOW))
        .await?;

    let export = render_health_summary(&current, &reports, &logs, Utc::now())?;
    tracing::info!(user_id = %current.id, bytes = export.bytes.len(), "Health summary exported");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export.filename),
            ),
        ],
        export.bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = crate::routes::paths::reports::REPORT_BY_ID,
    tag = "reports",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report", body = HealthReport),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such report")
    )
)]
pub async fn get_report(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<HealthReport>>, ApiError> {
    let report = server.stores.reports.get(id).await?;
    let report = require_ownership(&current, Operation::ReadReport, report, "Report")?;
    Ok(Json(api_success(report.open(server.cipher())?)))
}

#[utoipa::path(
    put,
    path = crate::routes::paths::reports::REPORT_BY_ID,
    tag = "reports",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Report id")),
    request_body = ReportUpdate,
    responses(
        (status = 200, description = "Updated report", body = HealthReport),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such report")
    )
)]
pub async fn update_report(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<ReportUpdate>,
) -> Result<Json<ApiResponse<HealthReport>>, ApiError> {
    let report = server.stores.reports.get(id).await?;
    let report = require_ownership(&current, Operation::UpdateReport, report, "Report")?;
    update.validate()?;

    let mut report = report.open(server.cipher())?;
    update.apply(&mut report);
    let report = server
        .stores
        .reports
        .update(&report.seal(server.cipher())?)
        .await?
        .open(server.cipher())?;

    Ok(Json(api_success(report)))
}

/// Delete metadata; stored file removal is best effort
#[utoipa::path(
    delete,
    path = crate::routes::paths::reports::REPORT_BY_ID,
    tag = "reports",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Report id")),
    responses(
        (status = 200, description = "Report deleted", body = MessageResponse),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "No such report")
    )
)]
pub async fn delete_report(
    State(server): State<PhrServer>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let report = server.stores.reports.get(id).await?;
    let report = require_ownership(&current, Operation::DeleteReport, report, "Report")?;

    match server.files.delete(&report.file_path).await {
        Ok(true) => {}
        Ok(false) => tracing::warn!(report_id = %report.id, "Stored file already missing"),
        Err(e) => tracing::warn!(report_id = %report.id, error = %e, "Failed to delete stored file"),
    }

    server.stores.reports.delete(report.id).await?;
    tracing::info!(user_id = %current.id, report_id = %report.id, "Report deleted");

    Ok(Json(api_success(MessageResponse::new("Report deleted successfully"))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_date_formats() {
        assert_eq!(
            parse_report_date("2025-02-01").unwrap().to_rfc3339(),
            "2025-02-01T00:00:00+00:00"
        );
        assert!(parse_report_date("2025-02-01T10:30:00Z").is_ok());
        assert!(parse_report_date("01/02/2025").is_err());
    }

    #[test]
    fn test_form_requires_file_and_title() {
        let form = UploadForm {
            report_type: Some("lab_test".into()),
            title: Some("CBC".into()),
            ..UploadForm::default()
        };
        assert!(form.into_parts().is_err());

        let form = UploadForm {
            file: Some(("cbc.pdf".into(), b"%PDF".to_vec())),
            report_type: Some("lab_test".into()),
            title: Some(" CBC ".into()),
            is_sensitive: Some("true".into()),
            ..UploadForm::default()
        };
        let (upload, name, _) = form.into_parts().unwrap();
        assert_eq!(upload.title, "CBC");
        assert!(upload.is_sensitive);
        assert_eq!(name, "cbc.pdf");
    }
}
