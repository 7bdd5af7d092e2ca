//! JWT access and refresh tokens
//!
//! Both kinds are HS-signed with the configured secret and carry a `kind`
//! claim so a refresh token can never be replayed as an access token.
//! Expiry is checked with zero leeway.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::models::{Role, User};

/// Issuer claim stamped on every token
pub const TOKEN_ISSUER: &str = "phr-server";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Wrong token type")]
    WrongKind,

    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("token configuration error: {0}")]
    Configuration(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT token claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: String,

    /// JWT ID (unique token identifier)
    pub jti: String,

    /// User email (access tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// User role (access tokens only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,

    pub kind: TokenKind,

    /// Issued at (seconds since epoch)
    pub iat: i64,

    /// Expiration (seconds since epoch)
    pub exp: i64,

    pub iss: String,
}

impl TokenClaims {
    pub fn user_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::MalformedToken)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.exp <= now.timestamp()
    }
}

pub struct JwtService {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtService {
    pub fn new(secret: &str, algorithm: &str, access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, TokenError> {
        let algorithm =
            Algorithm::from_str(algorithm).map_err(|e| TokenError::Configuration(format!("{algorithm}: {e}")))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(TokenError::Configuration(format!(
                "{algorithm:?} is not an HMAC algorithm"
            )));
        }
        if secret.is_empty() {
            return Err(TokenError::Configuration("signing secret is empty".to_string()));
        }

        Ok(Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, TokenError> {
        Self::new(
            &config.secret_key,
            &config.algorithm,
            Duration::minutes(config.access_token_expire_minutes),
            Duration::days(config.refresh_token_expire_days),
        )
    }

    /// Access token lifetime in seconds
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access_token(&self, user: &User) -> Result<String, TokenError> {
        self.issue_access_token_at(user, Utc::now())
    }

    pub fn issue_access_token_at(&self, user: &User, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        self.sign(TokenClaims {
            sub: user.id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: Some(user.email.clone()),
            role: Some(user.role),
            kind: TokenKind::Access,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.access_ttl).timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        })
    }

    pub fn issue_refresh_token(&self, user_id: Uuid) -> Result<String, TokenError> {
        let issued_at = Utc::now();
        self.sign(TokenClaims {
            sub: user_id.to_string(),
            jti: Uuid::new_v4().to_string(),
            email: None,
            role: None,
            kind: TokenKind::Refresh,
            iat: issued_at.timestamp(),
            exp: (issued_at + self.refresh_ttl).timestamp(),
            iss: TOKEN_ISSUER.to_string(),
        })
    }

    fn sign(&self, claims: TokenClaims) -> Result<String, TokenError> {
        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        self.verify_token_at(token, Utc::now())
    }

    /// Verify signature and structure, then expiry against `now`
    pub fn verify_token_at(&self, token: &str, now: DateTime<Utc>) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_issuer(&[TOKEN_ISSUER]);

        let data = decode::<TokenClaims>(token, &self.decoding_key, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::ImmatureSignature => TokenError::InvalidToken,
            _ => TokenError::MalformedToken,
        })?;

        if data.claims.is_expired_at(now) {
            return Err(TokenError::ExpiredToken);
        }
        Ok(data.claims)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.verify_token(token)?;
        match claims.kind {
            TokenKind::Access => Ok(claims),
            TokenKind::Refresh => Err(TokenError::WrongKind),
        }
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let claims = self.verify_token(token)?;
        match claims.kind {
            TokenKind::Refresh => Ok(claims),
            TokenKind::Access => Err(TokenError::WrongKind),
        }
    }
}
