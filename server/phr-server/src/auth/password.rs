//! Argon2id password hashing
//!
//! Hashing and verification are CPU-bound and run on the blocking pool.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};
use rand::rngs::OsRng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("invalid Argon2 parameters: {0}")]
    Params(String),

    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("password task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<PasswordError> for crate::error::ApiError {
    fn from(err: PasswordError) -> Self {
        crate::error::ApiError::internal(err.to_string())
    }
}

#[derive(Clone)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Argon2id, 19 MiB memory, 2 iterations, 1 lane, 32-byte output
    pub fn new() -> Result<Self, PasswordError> {
        let params = Params::new(19456, 2, 1, Some(32)).map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_string();
        let argon2 = self.argon2.clone();

        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| PasswordError::Hash(e.to_string()))
        })
        .await?
    }

    /// `false` for a wrong password and for an unparseable hash
    pub async fn verify(&self, password: &str, hash: &str) -> bool {
        let password = password.to_string();
        let hash = hash.to_string();
        let argon2 = self.argon2.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&hash) else {
                return false;
            };
            match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => true,
                Err(argon2::password_hash::Error::Password) => false,
                Err(e) => {
                    tracing::warn!(error = %e, "Password verification error");
                    false
                }
            }
        })
        .await;

        outcome.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_and_verify() {
        let service = PasswordService::new().unwrap();
        let hash = service.hash("correct horse battery").await.unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify("correct horse battery", &hash).await);
        assert!(!service.verify("wrong horse battery", &hash).await);
    }

    #[tokio::test]
    async fn test_hashes_are_salted() {
        let service = PasswordService::new().unwrap();
        let a = service.hash("same password").await.unwrap();
        let b = service.hash("same password").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_malformed_hash_is_false() {
        let service = PasswordService::new().unwrap();
        assert!(!service.verify("anything", "not-a-phc-string").await);
        assert!(!service.verify("anything", "").await);
    }
}
