use serde::{Deserialize, Serialize};

/// Which identifier classes are rewritten and how
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    #[serde(default = "enabled")]
    pub redact_emails: bool,
    #[serde(default = "enabled")]
    pub redact_phones: bool,
    #[serde(default = "enabled")]
    pub redact_ip_addresses: bool,
    /// Replace values with a truncated SHA-256 instead of a mask
    #[serde(default = "enabled")]
    pub hash_for_correlation: bool,
}

fn enabled() -> bool {
    true
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_emails: true,
            redact_phones: true,
            redact_ip_addresses: true,
            hash_for_correlation: true,
        }
    }
}
