//! Record stores
//!
//! Each collection sits behind an async trait so the server can run against
//! Postgres ([`postgres`]) or in-process maps ([`memory`]). Updates are
//! whole-record writes of a value the caller read and merged; there is no
//! version check, so two concurrent edits of one record race and the later
//! write wins.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{HealthInsight, HealthLog, HealthReport, ReportType, Role, User};
use crate::types::Page;

pub mod memory;
pub mod postgres;

/// One handle per collection, injected into the server state
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub logs: Arc<dyn HealthLogStore>,
    pub reports: Arc<dyn ReportStore>,
    pub insights: Arc<dyn InsightStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserStore::default()),
            logs: Arc::new(memory::MemoryHealthLogStore::default()),
            reports: Arc::new(memory::MemoryReportStore::default()),
            insights: Arc::new(memory::MemoryInsightStore::default()),
        }
    }

    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserStore::new(pool.clone())),
            logs: Arc::new(postgres::PgHealthLogStore::new(pool.clone())),
            reports: Arc::new(postgres::PgReportStore::new(pool.clone())),
            insights: Arc::new(postgres::PgInsightStore::new(pool)),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Optional `log_date` window, both ends inclusive
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl LogFilter {
    pub fn matches(&self, log: &HealthLog) -> bool {
        self.start_date.map_or(true, |start| log.log_date >= start)
            && self.end_date.map_or(true, |end| log.log_date <= end)
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the email is taken
    async fn create(&self, user: User) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn update(&self, user: &User) -> StoreResult<User>;

    async fn list(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<User>>;

    /// Patients whose `assigned_doctor_id` is the given doctor
    async fn list_assigned_patients(&self, doctor_id: Uuid) -> StoreResult<Vec<User>>;

    async fn count(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait HealthLogStore: Send + Sync {
    async fn create(&self, log: HealthLog) -> StoreResult<HealthLog>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthLog>>;

    /// Newest `log_date` first
    async fn list(&self, user_id: Uuid, filter: LogFilter, page: Page) -> StoreResult<Vec<HealthLog>>;

    /// Newest first, only logs carrying sleep hours
    async fn list_with_sleep(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<HealthLog>>;

    async fn update(&self, log: &HealthLog) -> StoreResult<HealthLog>;

    /// Returns whether a record was removed
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn count(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create(&self, report: HealthReport) -> StoreResult<HealthReport>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthReport>>;

    /// Newest `created_at` first
    async fn list(&self, user_id: Uuid, report_type: Option<ReportType>, page: Page)
        -> StoreResult<Vec<HealthReport>>;

    /// Every report of the user, newest `report_date` first
    async fn list_by_report_date(&self, user_id: Uuid) -> StoreResult<Vec<HealthReport>>;

    async fn update(&self, report: &HealthReport) -> StoreResult<HealthReport>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    async fn count(&self) -> StoreResult<i64>;
}

#[async_trait]
pub trait InsightStore: Send + Sync {
    async fn create(&self, insight: HealthInsight) -> StoreResult<HealthInsight>;

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthInsight>>;

    /// Newest `analysis_date` first
    async fn list(&self, user_id: Uuid) -> StoreResult<Vec<HealthInsight>>;

    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}
