//! Domain records and request payloads

pub mod health_log;
pub mod insight;
pub mod report;
pub mod user;

pub use health_log::{HealthLog, HealthLogCreate, HealthLogUpdate, Mood, Severity};
pub use insight::{
    AnalyzeSelectedRequest, ChatMessage, ChatRequest, HealthInsight, InsightSections, SaveInsightRequest,
    SymptomRequest,
};
pub use report::{HealthReport, ReportType, ReportUpdate, ReportUpload};
pub use user::{
    AssignmentRequest, LoginRequest, RefreshRequest, RegisterRequest, Role, TokenResponse, User, UserProfile,
    UserUpdate,
};
