//! In-process stores used by tests and `--in-memory` development runs

use std::cmp::Reverse;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    HealthLogStore, InsightStore, LogFilter, ReportStore, StoreError, StoreResult, UserStore,
};
use crate::models::{HealthInsight, HealthLog, HealthReport, ReportType, Role, User};
use crate::types::Page;

fn window<T>(items: Vec<T>, page: Page) -> Vec<T> {
    items
        .into_iter()
        .skip(page.skip_usize())
        .take(page.limit_usize())
        .collect()
}

fn count<T>(map: &HashMap<Uuid, T>) -> i64 {
    i64::try_from(map.len()).unwrap_or(i64::MAX)
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Conflict("Email already registered".to_string()));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn update(&self, user: &User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        let slot = users
            .get_mut(&user.id)
            .ok_or_else(|| StoreError::NotFound("User".to_string()))?;
        *slot = user.clone();
        Ok(user.clone())
    }

    async fn list(&self, role: Option<Role>, page: Page) -> StoreResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|user| role.map_or(true, |role| user.role == role))
            .cloned()
            .collect();
        users.sort_by_key(|user| Reverse(user.created_at));
        Ok(window(users, page))
    }

    async fn list_assigned_patients(&self, doctor_id: Uuid) -> StoreResult<Vec<User>> {
        let mut patients: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .filter(|user| user.role == Role::Patient && user.assigned_doctor_id == Some(doctor_id))
            .cloned()
            .collect();
        patients.sort_by(|a, b| a.full_name.cmp(&b.full_name));
        Ok(patients)
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(count(&*self.users.read().await))
    }
}

#[derive(Default)]
pub struct MemoryHealthLogStore {
    logs: RwLock<HashMap<Uuid, HealthLog>>,
}

impl MemoryHealthLogStore {
    async fn newest_first(&self, keep: impl Fn(&HealthLog) -> bool) -> Vec<HealthLog> {
        let mut logs: Vec<HealthLog> = self
            .logs
            .read()
            .await
            .values()
            .filter(|log| keep(log))
            .cloned()
            .collect();
        logs.sort_by_key(|log| Reverse(log.log_date));
        logs
    }
}

#[async_trait]
impl HealthLogStore for MemoryHealthLogStore {
    async fn create(&self, log: HealthLog) -> StoreResult<HealthLog> {
        self.logs.write().await.insert(log.id, log.clone());
        Ok(log)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthLog>> {
        Ok(self.logs.read().await.get(&id).cloned())
    }

    async fn list(&self, user_id: Uuid, filter: LogFilter, page: Page) -> StoreResult<Vec<HealthLog>> {
        let logs = self
            .newest_first(|log| log.user_id == user_id && filter.matches(log))
            .await;
        Ok(window(logs, page))
    }

    async fn list_with_sleep(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<HealthLog>> {
        let logs = self
            .newest_first(|log| log.user_id == user_id && log.sleep_hours.is_some())
            .await;
        Ok(window(logs, Page::first(limit)))
    }

    async fn update(&self, log: &HealthLog) -> StoreResult<HealthLog> {
        let mut logs = self.logs.write().await;
        let slot = logs
            .get_mut(&log.id)
            .ok_or_else(|| StoreError::NotFound("Health log".to_string()))?;
        *slot = log.clone();
        Ok(log.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.logs.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(count(&*self.logs.read().await))
    }
}

#[derive(Default)]
pub struct MemoryReportStore {
    reports: RwLock<HashMap<Uuid, HealthReport>>,
}

impl MemoryReportStore {
    async fn owned_by(&self, user_id: Uuid) -> Vec<HealthReport> {
        self.reports
            .read()
            .await
            .values()
            .filter(|report| report.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn create(&self, report: HealthReport) -> StoreResult<HealthReport> {
        self.reports.write().await.insert(report.id, report.clone());
        Ok(report)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthReport>> {
        Ok(self.reports.read().await.get(&id).cloned())
    }

    async fn list(
        &self,
        user_id: Uuid,
        report_type: Option<ReportType>,
        page: Page,
    ) -> StoreResult<Vec<HealthReport>> {
        let mut reports: Vec<HealthReport> = self
            .owned_by(user_id)
            .await
            .into_iter()
            .filter(|report| report_type.map_or(true, |kind| report.report_type == kind))
            .collect();
        reports.sort_by_key(|report| Reverse(report.created_at));
        Ok(window(reports, page))
    }

    async fn list_by_report_date(&self, user_id: Uuid) -> StoreResult<Vec<HealthReport>> {
        let mut reports = self.owned_by(user_id).await;
        reports.sort_by_key(|report| Reverse(report.report_date));
        Ok(reports)
    }

    async fn update(&self, report: &HealthReport) -> StoreResult<HealthReport> {
        let mut reports = self.reports.write().await;
        let slot = reports
            .get_mut(&report.id)
            .ok_or_else(|| StoreError::NotFound("Health report".to_string()))?;
        *slot = report.clone();
        Ok(report.clone())
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.reports.write().await.remove(&id).is_some())
    }

    async fn count(&self) -> StoreResult<i64> {
        Ok(count(&*self.reports.read().await))
    }
}

#[derive(Default)]
pub struct MemoryInsightStore {
    insights: RwLock<HashMap<Uuid, HealthInsight>>,
}

#[async_trait]
impl InsightStore for MemoryInsightStore {
    async fn create(&self, insight: HealthInsight) -> StoreResult<HealthInsight> {
        self.insights.write().await.insert(insight.id, insight.clone());
        Ok(insight)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<HealthInsight>> {
        Ok(self.insights.read().await.get(&id).cloned())
    }

    async fn list(&self, user_id: Uuid) -> StoreResult<Vec<HealthInsight>> {
        let mut insights: Vec<HealthInsight> = self
            .insights
            .read()
            .await
            .values()
            .filter(|insight| insight.user_id == user_id)
            .cloned()
            .collect();
        insights.sort_by_key(|insight| Reverse(insight.analysis_date));
        Ok(insights)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.insights.write().await.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HealthLogCreate;
    use chrono::{Duration, Utc};

    fn log_at(user_id: Uuid, days_ago: i64) -> HealthLog {
        HealthLogCreate {
            log_date: Some(Utc::now() - Duration::days(days_ago)),
            stress_level: 5,
            anxiety_level: 5,
            sleep_quality: 5,
            ..Default::default()
        }
        .into_log(user_id)
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryUserStore::default();
        let first = User::new("a@b.io".into(), "h".into(), "A".into(), None, Role::Patient);
        let second = User::new("a@b.io".into(), "h".into(), "B".into(), None, Role::Doctor);

        store.create(first).await.unwrap();
        assert!(matches!(store.create(second).await, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_logs_listed_newest_first_and_windowed() {
        let store = MemoryHealthLogStore::default();
        let owner = Uuid::new_v4();
        for days_ago in [3, 1, 2] {
            store.create(log_at(owner, days_ago)).await.unwrap();
        }
        store.create(log_at(Uuid::new_v4(), 0)).await.unwrap();

        let all = store.list(owner, LogFilter::default(), Page::first(10)).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|pair| pair[0].log_date >= pair[1].log_date));

        let tail = store.list(owner, LogFilter::default(), Page::new(2, 10)).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].id, all[2].id);
    }

    #[tokio::test]
    async fn test_log_date_filter() {
        let store = MemoryHealthLogStore::default();
        let owner = Uuid::new_v4();
        for days_ago in [10, 5, 1] {
            store.create(log_at(owner, days_ago)).await.unwrap();
        }
        let filter = LogFilter {
            start_date: Some(Utc::now() - Duration::days(6)),
            end_date: None,
        };
        let recent = store.list(owner, filter, Page::first(100)).await.unwrap();
        assert_eq!(recent.len(), 2);
    }

    #[tokio::test]
    async fn test_update_missing_record() {
        let store = MemoryHealthLogStore::default();
        let log = log_at(Uuid::new_v4(), 0);
        assert!(matches!(store.update(&log).await, Err(StoreError::NotFound(_))));
    }
}
