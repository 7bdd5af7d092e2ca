use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

use phr_server::{
    config::AppConfig,
    create_app,
    models::HealthLogCreate,
    server::PhrServer,
    services::{CompletionRequest, GenerationError, TextGenerator},
    storage::Stores,
};

const ADMIN_EMAIL: &str = "admin@phr.test";
const ADMIN_PASSWORD: &str = "admin-password";
const BOUNDARY: &str = "phr-test-boundary";

/// Provider stand-in: a fixed reply, or an upstream failure when `None`
struct StubGenerator {
    reply: Option<String>,
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn complete(&self, _request: CompletionRequest) -> Result<String, GenerationError> {
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => Err(GenerationError::Http("connection refused".into())),
        }
    }
}

/// Test harness over in-memory stores
struct TestApp {
    server: PhrServer,
    app: Router,
    _uploads: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        Self::with_generator(None).await
    }

    async fn with_generator(reply: Option<&str>) -> Self {
        let uploads = TempDir::new().expect("temp upload dir");
        let mut config = AppConfig::default();
        config.upload_dir = uploads.path().to_string_lossy().into_owned();
        config.admin_email = ADMIN_EMAIL.into();
        config.admin_password = ADMIN_PASSWORD.into();

        let generator = Arc::new(StubGenerator {
            reply: reply.map(str::to_string),
        });
        let server = PhrServer::with_generator(config, Stores::in_memory(), None, generator)
            .expect("Failed to create test server");
        server.seed_admin().await.expect("seed admin");
        let app = create_app(server.clone());

        Self {
            server,
            app,
            _uploads: uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    /// Register and return (access token, user id)
    async fn register(&self, email: &str, role: &str) -> (String, Uuid) {
        let (status, body) = self
            .json(
                "POST",
                "/api/auth/register",
                None,
                json!({
                    "email": email,
                    "password": "correct-horse",
                    "full_name": format!("Test {role}"),
                    "role": role,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let token = body["data"]["access_token"].as_str().unwrap().to_string();
        let id = Uuid::parse_str(body["data"]["user"]["id"].as_str().unwrap()).unwrap();
        (token, id)
    }

    async fn admin_token(&self) -> String {
        let (status, body) = self
            .json(
                "POST",
                "/api/auth/login",
                None,
                json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "admin login failed: {body}");
        body["data"]["access_token"].as_str().unwrap().to_string()
    }

    async fn create_log(&self, token: &str, body: Value) -> Value {
        let (status, body) = self.json("POST", "/api/logs", Some(token), body).await;
        assert_eq!(status, StatusCode::CREATED, "create log failed: {body}");
        body["data"].clone()
    }

    async fn upload_report(&self, token: &str, title: &str) -> Value {
        self.upload_report_of_type(token, "lab_test", title).await
    }

    async fn upload_report_of_type(&self, token: &str, report_type: &str, title: &str) -> Value {
        let mut payload = String::new();
        for (name, value) in [("report_type", report_type), ("title", title), ("diagnosis", "Mild anemia")] {
            payload.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            ));
        }
        payload.push_str(&format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cbc.pdf\"\r\nContent-Type: application/pdf\r\n\r\n%PDF-1.4 test\r\n--{BOUNDARY}--\r\n"
        ));

        let request = Request::builder()
            .method("POST")
            .uri("/api/reports/upload")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(payload))
            .unwrap();
        let (status, body) = self.send(request).await;
        assert_eq!(status, StatusCode::CREATED, "upload failed: {body}");
        body["data"].clone()
    }

    /// Raw export response; the body is PDF bytes, not JSON
    async fn export_summary(&self, token: &str) -> (StatusCode, HeaderMap, Bytes) {
        let request = Request::builder()
            .method("GET")
            .uri("/api/reports/export-summary")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, body)
    }
}

fn log_dates(body: &Value) -> Vec<DateTime<Utc>> {
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["log_date"].as_str().unwrap().parse().unwrap())
        .collect()
}

fn query_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[tokio::test]
async fn test_register_issues_token_for_new_user_and_rejects_duplicate_email() {
    let app = TestApp::new().await;
    let (token, id) = app.register("jane@example.com", "patient").await;

    let claims = app.server.tokens.verify_access_token(&token).unwrap();
    assert_eq!(claims.user_id().unwrap(), id);

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/register",
            None,
            json!({"email": "JANE@example.com", "password": "another-pass", "full_name": "Jane Again"}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn test_access_token_lifetime_matches_configuration() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ttl@example.com", "patient").await;

    let claims = app.server.tokens.verify_access_token(&token).unwrap();
    let expected = app.server.config.access_token_expire_minutes * 60;
    assert_eq!(claims.exp - claims.iat, expected);
}

#[tokio::test]
async fn test_login_and_refresh_flow() {
    let app = TestApp::new().await;
    app.register("flow@example.com", "patient").await;

    let (status, _) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "flow@example.com", "password": "wrong-password"}),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "flow@example.com", "password": "correct-horse"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();
    let access = body["data"]["access_token"].as_str().unwrap().to_string();

    let (status, body) = app
        .json("POST", "/api/auth/refresh", None, json!({"refresh_token": refresh}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].is_string());

    // An access token is not accepted as a refresh token
    let (status, _) = app
        .json("POST", "/api/auth/refresh", None, json!({"refresh_token": access}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = TestApp::new().await;
    for uri in ["/api/logs", "/api/reports", "/api/ai/saved-insights", "/api/auth/me"] {
        let (status, _) = app.get(uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
    }

    let (status, _) = app.get("/api/logs", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inactive_account_is_forbidden() {
    let app = TestApp::new().await;
    let (token, id) = app.register("inactive@example.com", "patient").await;

    let mut user = app.server.stores.users.find_by_id(id).await.unwrap().unwrap();
    user.is_active = false;
    app.server.stores.users.update(&user).await.unwrap();

    let (status, _) = app.get("/api/logs", Some(&token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            "POST",
            "/api/auth/login",
            None,
            json!({"email": "inactive@example.com", "password": "correct-horse"}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Inactive user account");
}

#[tokio::test]
async fn test_foreign_records_are_forbidden_and_unknown_ids_not_found() {
    let app = TestApp::new().await;
    let (owner, _) = app.register("owner@example.com", "patient").await;
    let (other, _) = app.register("other@example.com", "patient").await;

    let log = app.create_log(&owner, json!({"temperature": 37.2})).await;
    let report = app.upload_report(&owner, "CBC").await;
    let (status, body) = app
        .json("POST", "/api/ai/save-insight", Some(&owner), json!({"insights": "Sleep is steady"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let insight_id = body["data"]["insight_id"].as_str().unwrap().to_string();

    let log_uri = format!("/api/logs/{}", log["id"].as_str().unwrap());
    let report_uri = format!("/api/reports/{}", report["id"].as_str().unwrap());
    let insight_uri = format!("/api/ai/saved-insights/{insight_id}");

    for uri in [&log_uri, &report_uri, &insight_uri] {
        let (status, _) = app.get(uri, Some(&other)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        let (status, _) = app.delete(uri, &other).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        let (status, _) = app.get(uri, Some(&owner)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }

    let missing = Uuid::new_v4();
    for uri in [
        format!("/api/logs/{missing}"),
        format!("/api/reports/{missing}"),
        format!("/api/ai/saved-insights/{missing}"),
    ] {
        let (status, _) = app.get(&uri, Some(&other)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_vitals_round_trip_and_partial_update() {
    let app = TestApp::new().await;
    let (token, id) = app.register("vitals@example.com", "patient").await;

    let log = app
        .create_log(
            &token,
            json!({
                "temperature": 38.1,
                "blood_pressure_systolic": 128,
                "blood_pressure_diastolic": 84,
                "heart_rate": 92,
                "has_fever": true,
                "mood": "low",
                "sleep_hours": 5.5,
                "sleep_quality": 4,
            }),
        )
        .await;
    assert_eq!(log["user_id"], id.to_string());
    assert_eq!(log["temperature"], 38.1);
    assert_eq!(log["stress_level"], 5);

    let uri = format!("/api/logs/{}", log["id"].as_str().unwrap());
    let (status, body) = app.json("PUT", &uri, Some(&token), json!({"heart_rate": 80})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["heart_rate"], 80);
    assert_eq!(body["data"]["temperature"], 38.1);
    assert_eq!(body["data"]["has_fever"], true);
    assert_eq!(body["data"]["mood"], "low");

    let (status, _) = app.json("PUT", &uri, Some(&token), json!({"stress_level": 11})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_update_field_is_unprocessable() {
    let app = TestApp::new().await;
    let (token, _) = app.register("strict@example.com", "patient").await;
    let log = app.create_log(&token, json!({})).await;
    let uri = format!("/api/logs/{}", log["id"].as_str().unwrap());

    let (status, _) = app
        .json("PUT", &uri, Some(&token), json!({"user_id": Uuid::new_v4()}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app.json("PUT", "/api/auth/me", Some(&token), json!({"role": "admin"})).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_log_listing_pages_through_large_history() {
    let app = TestApp::new().await;
    let (token, id) = app.register("many@example.com", "patient").await;

    let base = Utc::now();
    for i in 0..150 {
        let log = HealthLogCreate {
            log_date: Some(base - Duration::minutes(i)),
            stress_level: 5,
            anxiety_level: 5,
            sleep_quality: 5,
            ..HealthLogCreate::default()
        }
        .into_log(id);
        app.server.stores.logs.create(log).await.unwrap();
    }

    let (status, first) = app.get("/api/logs", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let first = log_dates(&first);
    assert_eq!(first.len(), 100);

    let (_, second) = app.get("/api/logs?skip=100&limit=100", Some(&token)).await;
    let second = log_dates(&second);
    assert_eq!(second.len(), 50);

    let all: Vec<_> = first.iter().chain(second.iter()).collect();
    assert!(all.windows(2).all(|pair| pair[0] > pair[1]), "logs must be newest first across pages");
    assert!(first.last().unwrap() > second.first().unwrap());

    let (_, body) = app.get("/api/logs?limit=1000", Some(&token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 100);
}

#[tokio::test]
async fn test_log_listing_honours_date_range() {
    let app = TestApp::new().await;
    let (token, _) = app.register("range@example.com", "patient").await;

    let now = Utc::now();
    for days_ago in [1, 3, 5, 7] {
        app.create_log(&token, json!({"log_date": query_date(now - Duration::days(days_ago))}))
            .await;
    }

    let start = query_date(now - Duration::days(6));
    let end = query_date(now - Duration::days(2));

    let (status, body) = app
        .get(&format!("/api/logs?start_date={start}&end_date={end}"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    let dates = log_dates(&body);
    assert_eq!(dates.len(), 2);
    assert!(dates.iter().all(|date| *date >= now - Duration::days(6) && *date <= now - Duration::days(2)));

    let (_, body) = app.get(&format!("/api/logs?start_date={start}"), Some(&token)).await;
    assert_eq!(log_dates(&body).len(), 3);

    let (_, body) = app.get(&format!("/api/logs?end_date={end}"), Some(&token)).await;
    assert_eq!(log_dates(&body).len(), 3);

    let (status, _) = app.get("/api/logs?start_date=yesterday", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_today_logs_exclude_earlier_days() {
    let app = TestApp::new().await;
    let (token, _) = app.register("today@example.com", "patient").await;
    let (other, _) = app.register("other@example.com", "patient").await;
    app.create_log(&other, json!({"temperature": 37.0})).await;

    let todays = app.create_log(&token, json!({"temperature": 36.6})).await;
    app.create_log(&token, json!({"log_date": query_date(Utc::now() - Duration::days(2))}))
        .await;

    let (status, body) = app.get("/api/logs/today", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let logs = body["data"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["id"], todays["id"]);
}

#[tokio::test]
async fn test_doctor_sees_patient_reports_only_after_assignment() {
    let app = TestApp::new().await;
    let admin = app.admin_token().await;
    let (patient, patient_id) = app.register("patient@example.com", "patient").await;
    let (doctor, doctor_id) = app.register("doctor@example.com", "doctor").await;

    let first = app.upload_report(&patient, "First").await;
    let second = app.upload_report(&patient, "Second").await;

    let reports_uri = format!("/api/doctor/patient/{patient_id}/reports");
    let (status, _) = app.get(&reports_uri, Some(&doctor)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Patients never use the doctor view
    let (status, _) = app.get(&reports_uri, Some(&patient)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .json(
            "PUT",
            "/api/admin/assignments",
            Some(&admin),
            json!({"patient_id": patient_id, "doctor_id": doctor_id}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["assigned_doctor_id"], doctor_id.to_string());

    let (status, body) = app.get(&reports_uri, Some(&doctor)).await;
    assert_eq!(status, StatusCode::OK);
    let reports = body["data"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports.first().unwrap()["id"], second["id"]);
    assert_eq!(reports.get(1).unwrap()["id"], first["id"]);
    assert_eq!(reports.first().unwrap()["diagnosis"], "Mild anemia");

    let (status, body) = app.get("/api/doctor/patients", Some(&doctor)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app
        .get(&format!("/api/doctor/patient/{}/reports", Uuid::new_v4()), Some(&doctor))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .delete(&format!("/api/admin/assignments/{patient_id}"), &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&reports_uri, Some(&doctor)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleting_report_with_missing_file_succeeds() {
    let app = TestApp::new().await;
    let (token, _) = app.register("files@example.com", "patient").await;
    let report = app.upload_report(&token, "Scan").await;

    std::fs::remove_file(report["file_path"].as_str().unwrap()).unwrap();

    let uri = format!("/api/reports/{}", report["id"].as_str().unwrap());
    let (status, _) = app.delete(&uri, &token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_provider_failure_degrades_insights() {
    let app = TestApp::new().await;
    let (token, _) = app.register("ai@example.com", "patient").await;

    let (status, body) = app.get("/api/ai/insights", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["logs_count"], 0);

    app.create_log(&token, json!({"temperature": 37.0, "sleep_hours": 7.5})).await;

    let (status, body) = app.get("/api/ai/insights", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["insights"], "unavailable");
    assert!(body["data"]["error"].as_str().unwrap().starts_with("AI analysis failed"));

    let (status, body) = app
        .json("POST", "/api/ai/chat", Some(&token), json!({"message": "How am I doing?"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["error"].is_string());
    assert!(body["data"]["response"].is_string());
}

#[tokio::test]
async fn test_generated_insights_are_returned() {
    let app = TestApp::with_generator(Some("Your sleep looks consistent.")).await;
    let (token, _) = app.register("ok@example.com", "patient").await;
    let log = app.create_log(&token, json!({"sleep_hours": 8.0})).await;

    let (status, body) = app
        .json(
            "POST",
            "/api/ai/analyze-selected",
            Some(&token),
            json!({"log_ids": [log["id"]]}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["insights"], "Your sleep looks consistent.");
    assert_eq!(body["data"]["logs_analyzed"], 1);
}

#[tokio::test]
async fn test_admin_routes_require_admin_role() {
    let app = TestApp::new().await;
    let (patient, _) = app.register("plain@example.com", "patient").await;
    let admin = app.admin_token().await;

    for uri in ["/api/admin/users", "/api/stats"] {
        let (status, _) = app.get(uri, Some(&patient)).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        let (status, _) = app.get(uri, Some(&admin)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }

    let (_, body) = app.get("/api/stats", Some(&admin)).await;
    assert_eq!(body["data"]["total_users"], 2);

    let (_, body) = app.get("/api/admin/users?role=patient", Some(&admin)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_cannot_self_register() {
    let app = TestApp::new().await;
    let (status, _) = app
        .json(
            "POST",
            "/api/auth/register",
            None,
            json!({"email": "root@example.com", "password": "correct-horse", "full_name": "Root", "role": "admin"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint_reports_in_memory_backend() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["checks"]["database"], "in-memory");
}

#[tokio::test]
async fn test_report_listing_filters_by_type() {
    let app = TestApp::new().await;
    let (token, _) = app.register("types@example.com", "patient").await;

    let cbc = app.upload_report_of_type(&token, "lab_test", "CBC").await;
    app.upload_report_of_type(&token, "prescription", "Iron supplements").await;
    app.upload_report_of_type(&token, "xray", "Chest").await;

    let (status, body) = app.get("/api/reports?report_type=lab_test", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let reports = body["data"].as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["id"], cbc["id"]);
    assert_eq!(reports[0]["report_type"], "lab_test");

    let (_, body) = app.get("/api/reports", Some(&token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    let (status, _) = app.get("/api/reports?report_type=blood_test", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_export_summary_streams_pdf_attachment() {
    let app = TestApp::new().await;
    let (token, _) = app.register("export@example.com", "patient").await;
    app.create_log(&token, json!({"temperature": 36.9})).await;
    app.upload_report(&token, "CBC").await;

    let (status, headers, body) = app.export_summary(&token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/pdf");
    let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
    let expected = format!("attachment; filename=\"health_summary_Test_patient_{}.pdf\"", Utc::now().format("%Y%m%d"));
    assert_eq!(disposition, expected);
    assert!(body.starts_with(b"%PDF"));
}

#[tokio::test]
async fn test_export_summary_filename_survives_unusual_names() {
    let app = TestApp::new().await;
    let (token, _) = app.register("quoted@example.com", "patient").await;

    for (full_name, safe) in [("Jane \"JJ\" Doe", "Jane_JJ_Doe"), ("Jane\nDoe", "Jane_Doe"), ("Jane; filename=x", "Jane_filenamex")] {
        let (status, _) = app
            .json("PUT", "/api/auth/me", Some(&token), json!({"full_name": full_name}))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, headers, _) = app.export_summary(&token).await;
        assert_eq!(status, StatusCode::OK, "export failed for {full_name:?}");
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        let filename = disposition
            .strip_prefix("attachment; filename=\"")
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap();
        assert!(filename.starts_with(&format!("health_summary_{safe}_")), "{filename}");
        assert!(filename
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')));
    }
}

#[tokio::test]
async fn test_upload_without_multipart_body_is_unprocessable() {
    let app = TestApp::new().await;
    let (token, _) = app.register("form@example.com", "patient").await;

    let (status, body) = app
        .json("POST", "/api/reports/upload", Some(&token), json!({"title": "CBC"}))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error_type"], "unprocessable_entity");
}
