//! PII redaction for log output.
//!
//! Identifiers such as email addresses and phone numbers must not reach the
//! log sink in clear text. [`PiiRedactor`] rewrites them either into a short
//! correlation hash (`EMAIL[3q2+7w==]`), so that two lines about the same
//! account can still be matched, or into a masked form (`j***@e***`).
//!
//! ```rust
//! use logger_redacted::{PiiRedactor, RedactionConfig};
//!
//! let redactor = PiiRedactor::new(RedactionConfig::default()).unwrap();
//! let line = redactor.redact("login failed for jane@example.com");
//! assert!(!line.contains("jane@example.com"));
//! ```

pub mod config;
pub mod redactor;

pub use config::RedactionConfig;
pub use redactor::{PiiRedactor, RedactorError};
