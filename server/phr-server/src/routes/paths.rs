//! Route path constants shared by the router and the OpenAPI annotations

pub mod health {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const STATS: &str = "/api/stats";
}

pub mod auth {
    pub const REGISTER: &str = "/api/auth/register";
    pub const LOGIN: &str = "/api/auth/login";
    pub const REFRESH: &str = "/api/auth/refresh";
    pub const ME: &str = "/api/auth/me";
    pub const LOGOUT: &str = "/api/auth/logout";
    pub const VERIFY_TOKEN: &str = "/api/auth/verify-token";
}

pub mod logs {
    pub const LOGS: &str = "/api/logs";
    pub const TODAY: &str = "/api/logs/today";
    pub const LOG_BY_ID: &str = "/api/logs/:id";
}

pub mod reports {
    pub const REPORTS: &str = "/api/reports";
    pub const UPLOAD: &str = "/api/reports/upload";
    pub const EXPORT_SUMMARY: &str = "/api/reports/export-summary";
    pub const REPORT_BY_ID: &str = "/api/reports/:id";
}

pub mod doctor {
    pub const PATIENTS: &str = "/api/doctor/patients";
    pub const PATIENT_REPORTS: &str = "/api/doctor/patient/:id/reports";
    pub const PATIENT_LOGS: &str = "/api/doctor/patient/:id/logs";
}

pub mod ai {
    pub const ANALYZE_SELECTED: &str = "/api/ai/analyze-selected";
    pub const INSIGHTS: &str = "/api/ai/insights";
    pub const SYMPTOM_ADVICE: &str = "/api/ai/symptom-advice";
    pub const CHAT: &str = "/api/ai/chat";
    pub const SLEEP_ANALYSIS: &str = "/api/ai/sleep-analysis";
    pub const SAVED_INSIGHTS: &str = "/api/ai/saved-insights";
    pub const SAVED_INSIGHT_BY_ID: &str = "/api/ai/saved-insights/:id";
    pub const SAVE_INSIGHT: &str = "/api/ai/save-insight";
}

pub mod admin {
    pub const ASSIGNMENTS: &str = "/api/admin/assignments";
    pub const ASSIGNMENT_BY_PATIENT: &str = "/api/admin/assignments/:patient_id";
    pub const USERS: &str = "/api/admin/users";
}
