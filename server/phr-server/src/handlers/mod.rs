pub mod admin;
pub mod ai;
pub mod auth;
pub mod doctor;
pub mod health;
pub mod logs;
pub mod reports;

use serde::Serialize;
use utoipa::ToSchema;

/// Plain acknowledgement body
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Health log deleted successfully")]
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
