//! Authentication and authorization
//!
//! - [`password`]: Argon2id hashing
//! - [`tokens`]: JWT access/refresh tokens
//! - [`context`]: bearer-token extractor resolving the active caller
//! - [`policy`]: static access table and its evaluator

pub mod context;
pub mod password;
pub mod policy;
pub mod tokens;

pub use context::CurrentUser;
pub use password::PasswordService;
pub use policy::{authorize, require_doctor_assignment, require_ownership, require_role, Operation};
pub use tokens::{JwtService, TokenClaims, TokenError, TokenKind};
