//! Current-user extraction
//!
//! Handlers take a [`CurrentUser`] argument; extraction verifies the bearer
//! access token, loads the subject and rejects inactive accounts before the
//! handler body runs.

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};

use crate::error::ApiError;
use crate::models::User;
use crate::server::PhrServer;

/// Authenticated, active caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl std::ops::Deref for CurrentUser {
    type Target = User;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

fn extract_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Not authenticated"))?;

    let (scheme, token) = auth_header
        .split_once(' ')
        .ok_or_else(|| ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>"))?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(ApiError::authentication(
            "Invalid Authorization header format. Expected: Bearer <token>",
        ));
    }
    Ok(token.trim())
}

/// Verify `token` as an access token and load its active subject
pub async fn resolve_current_user(server: &PhrServer, token: &str) -> Result<User, ApiError> {
    let claims = server.tokens.verify_access_token(token)?;
    let user_id = claims.user_id()?;

    let user = server
        .stores
        .users
        .find_by_id(user_id)
        .await?
        .ok_or_else(|| ApiError::authentication("Could not validate credentials"))?;

    if !user.is_active {
        tracing::warn!(user_id = %user.id, "Inactive account presented a valid token");
        return Err(ApiError::authorization("Inactive user account"));
    }
    Ok(user)
}

#[async_trait]
impl FromRequestParts<PhrServer> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, server: &PhrServer) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts)?;
        let user = resolve_current_user(server, token).await?;
        tracing::Span::current().record("user_id", tracing::field::display(user.id));
        Ok(CurrentUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn test_bearer_token_extracted() {
        assert_eq!(extract_token(&parts(Some("Bearer abc.def.ghi"))).unwrap(), "abc.def.ghi");
        assert_eq!(extract_token(&parts(Some("bearer abc"))).unwrap(), "abc");
    }

    #[test]
    fn test_missing_or_wrong_scheme_rejected() {
        assert!(extract_token(&parts(None)).is_err());
        assert!(extract_token(&parts(Some("Basic dXNlcjpwYXNz"))).is_err());
        assert!(extract_token(&parts(Some("Bearer "))).is_err());
        assert!(extract_token(&parts(Some("Bearer"))).is_err());
    }
}
