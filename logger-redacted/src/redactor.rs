use crate::config::RedactionConfig;
use base64::{engine::general_purpose, Engine as _};
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use thiserror::Error;

const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
const PHONE_PATTERN: &str = r"(?:\+\d{1,3}[-.\s]?)?\(?\b[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b";
const IP_PATTERN: &str = r"\b(?:[0-9]{1,3}\.){3}[0-9]{1,3}\b";

#[derive(Debug, Error)]
pub enum RedactorError {
    #[error("Invalid redaction pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// PII redactor for log messages and structured log fields
#[derive(Debug, Clone)]
pub struct PiiRedactor {
    config: RedactionConfig,
    email: Regex,
    phone: Regex,
    ip: Regex,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Result<Self, RedactorError> {
        Ok(Self {
            config,
            email: Regex::new(EMAIL_PATTERN)?,
            phone: Regex::new(PHONE_PATTERN)?,
            ip: Regex::new(IP_PATTERN)?,
        })
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_ip_addresses {
            result = self.redact_ip_addresses(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        result
    }

    /// Redact a value known to be an email address, e.g. a login identifier
    pub fn redact_email(&self, email: &str) -> String {
        if self.config.hash_for_correlation {
            format!("EMAIL[{}]", hash_value(email))
        } else {
            mask_email(email)
        }
    }

    fn redact_emails(&self, text: &str) -> String {
        self.email
            .replace_all(text, |caps: &Captures| {
                caps.get(0)
                    .map(|m| self.redact_email(m.as_str()))
                    .unwrap_or_default()
            })
            .into_owned()
    }

    fn redact_phones(&self, text: &str) -> String {
        self.phone
            .replace_all(text, |caps: &Captures| {
                let phone = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    format!("PHONE[{}]", hash_value(phone))
                } else {
                    "(***) ***-****".to_string()
                }
            })
            .into_owned()
    }

    fn redact_ip_addresses(&self, text: &str) -> String {
        self.ip
            .replace_all(text, |caps: &Captures| {
                let ip = caps.get(0).map_or("", |m| m.as_str());
                if self.config.hash_for_correlation {
                    return format!("IP[{}]", hash_value(ip));
                }
                let octets: Vec<&str> = ip.split('.').collect();
                match (octets.first(), octets.last()) {
                    (Some(first), Some(last)) if octets.len() == 4 => {
                        format!("{first}.***.***.{last}")
                    }
                    _ => "***.***.***.***".to_string(),
                }
            })
            .into_owned()
    }
}

fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let l = local.chars().next().map(String::from).unwrap_or_default();
            let d = domain.chars().next().map(String::from).unwrap_or_default();
            format!("{l}***@{d}***")
        }
        None => "***@***".to_string(),
    }
}

/// First 8 bytes of SHA-256, base64-encoded
fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    general_purpose::STANDARD.encode(digest.get(..8).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn masking() -> PiiRedactor {
        PiiRedactor::new(RedactionConfig {
            hash_for_correlation: false,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_email_redaction() {
        let redacted = masking().redact("User john.doe@example.com logged in");
        assert_eq!(redacted, "User j***@e*** logged in");
    }

    #[test]
    fn test_phone_redaction() {
        let redacted = masking().redact("Call me at (555) 123-4567");
        assert!(redacted.contains("(***) ***-****"));
        assert!(!redacted.contains("4567"));
    }

    #[test]
    fn test_ip_redaction() {
        let redacted = masking().redact("request from 192.168.1.100");
        assert_eq!(redacted, "request from 192.***.***.100");
    }

    #[test]
    fn test_hash_correlation_is_stable() {
        let redactor = PiiRedactor::new(RedactionConfig::default()).unwrap();
        let a = redactor.redact_email("jane@example.com");
        let b = redactor.redact_email("jane@example.com");
        let c = redactor.redact_email("john@example.com");

        assert!(a.starts_with("EMAIL["));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_uuid_paths_untouched() {
        let redactor = PiiRedactor::new(RedactionConfig::default()).unwrap();
        let path = "/api/logs/6f1c2a9e-3b7d-4c1e-9a2f-0d5e8b7c6a41";
        assert_eq!(redactor.redact(path), path);
    }

    #[test]
    fn test_disabled_classes_are_kept() {
        let redactor = PiiRedactor::new(RedactionConfig {
            redact_emails: false,
            ..Default::default()
        })
        .unwrap();
        assert_eq!(redactor.redact("a@b.io"), "a@b.io");
    }
}
