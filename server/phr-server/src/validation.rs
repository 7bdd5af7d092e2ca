//! Request validation utilities for consistent validation across handlers
//!
//! Create and update payloads implement [`RequestValidation`]; handlers call
//! `validate()` before touching a store, so out-of-range input never reaches
//! persistence and always surfaces as a 400 validation error.

use axum::extract::FromRequest;

use crate::error::ApiError;

/// `Json` whose rejections (malformed body, unknown fields, wrong content
/// type) surface as an [`ApiError`] envelope with status 422
#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Trait for validating request payloads
pub trait RequestValidation {
    /// Returns `Ok(())` if validation passes, or a validation error naming
    /// the first offending field.
    fn validate(&self) -> Result<(), ApiError>;
}

/// Fail with a validation error unless the predicate holds
///
/// ```rust,ignore
/// validate_field!(self.email, self.email.contains('@'), "Invalid email format");
/// ```
#[macro_export]
macro_rules! validate_field {
    ($field:expr, $predicate:expr, $message:expr) => {
        if !$predicate {
            return Err($crate::error::ApiError::validation($message));
        }
    };
}

/// Non-empty after trimming
#[macro_export]
macro_rules! validate_required {
    ($field:expr, $message:expr) => {
        $crate::validate_field!($field, !$field.trim().is_empty(), $message);
    };
}

/// String length (in chars) within `min..=max`
#[macro_export]
macro_rules! validate_length {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        let len = $field.chars().count();
        $crate::validate_field!($field, len >= $min && len <= $max, $message);
    };
}

/// Basic email shape check
#[macro_export]
macro_rules! validate_email {
    ($field:expr, $message:expr) => {
        $crate::validate_field!(
            $field,
            $field
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.')),
            $message
        );
    };
}

/// Inclusive numeric range
///
/// ```rust,ignore
/// validate_range!(self.stress_level, 1, 10, "stress_level must be between 1 and 10");
/// ```
#[macro_export]
macro_rules! validate_range {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        $crate::validate_field!($field, $field >= $min && $field <= $max, $message);
    };
}

/// Inclusive numeric range for optional fields; `None` always passes
#[macro_export]
macro_rules! validate_optional_range {
    ($field:expr, $min:expr, $max:expr, $message:expr) => {
        if let Some(value) = $field {
            $crate::validate_range!(value, $min, $max, $message);
        }
    };
}
