use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{require_role, CurrentUser, Operation};
use crate::error::{api_success, ApiError, ApiResponse};
use crate::handlers::MessageResponse;
use crate::models::{LoginRequest, RefreshRequest, RegisterRequest, Role, TokenResponse, User, UserProfile, UserUpdate};
use crate::server::PhrServer;
use crate::storage::StoreError;
use crate::validation::{ApiJson, RequestValidation};

const BAD_CREDENTIALS: &str = "Incorrect email or password";

/// Result of a token check
#[derive(Debug, Serialize, ToSchema)]
pub struct TokenVerification {
    pub valid: bool,
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

fn token_pair(server: &PhrServer, user: &User) -> Result<TokenResponse, ApiError> {
    Ok(TokenResponse {
        access_token: server.tokens.issue_access_token(user)?,
        refresh_token: server.tokens.issue_refresh_token(user.id)?,
        token_type: "bearer".to_string(),
        expires_in: server.tokens.access_ttl_seconds(),
        user: UserProfile::from(user),
    })
}

/// Register a patient or doctor account
#[utoipa::path(
    post,
    path = crate::routes::paths::auth::REGISTER,
    tag = "authentication",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = TokenResponse),
        (status = 400, description = "Invalid payload or admin role requested"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(server): State<PhrServer>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<TokenResponse>>), ApiError> {
    request.validate()?;

    let email = request.normalized_email();
    if server.stores.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::conflict("Email already registered"));
    }

    let hashed = server.passwords.hash(&request.password).await?;
    let user = User::new(email, hashed, request.full_name.trim().to_string(), request.phone.clone(), request.role());
    let user = server.stores.users.create(user).await?;

    tracing::info!(
        user_id = %user.id,
        email = %server.redactor.redact_email(&user.email),
        role = %user.role,
        "User registered"
    );

    Ok((StatusCode::CREATED, Json(api_success(token_pair(&server, &user)?))))
}

/// Exchange credentials for a token pair
#[utoipa::path(
    post,
    path = crate::routes::paths::auth::LOGIN,
    tag = "authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Authenticated", body = TokenResponse),
        (status = 401, description = "Incorrect email or password"),
        (status = 403, description = "Inactive account")
    )
)]
pub async fn login(
    State(server): State<PhrServer>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let email = request.email.trim().to_ascii_lowercase();
    let Some(mut user) = server.stores.users.find_by_email(&email).await? else {
        tracing::warn!(email = %server.redactor.redact_email(&email), "Login for unknown account");
        return Err(ApiError::authentication(BAD_CREDENTIALS));
    };

    if !server.passwords.verify(&request.password, &user.hashed_password).await {
        tracing::warn!(user_id = %user.id, "Login with wrong password");
        return Err(ApiError::authentication(BAD_CREDENTIALS));
    }
    if !user.is_active {
        return Err(ApiError::authorization("Inactive user account"));
    }

    user.last_login = Some(Utc::now());
    let user = server.stores.users.update(&user).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(api_success(token_pair(&server, &user)?)))
}

/// Mint a fresh token pair from a refresh token
#[utoipa::path(
    post,
    path = crate::routes::paths::auth::REFRESH,
    tag = "authentication",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 401, description = "Invalid, expired or non-refresh token"),
        (status = 403, description = "Inactive account")
    )
)]
pub async fn refresh(
    State(server): State<PhrServer>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    let claims = server.tokens.verify_refresh_token(request.refresh_token.trim())?;
    let user = server
        .stores
        .users
        .find_by_id(claims.user_id()?)
        .await?
        .ok_or_else(|| ApiError::authentication("Could not validate credentials"))?;

    if !user.is_active {
        return Err(ApiError::authorization("Inactive user account"));
    }

    Ok(Json(api_success(token_pair(&server, &user)?)))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::auth::ME,
    tag = "authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller profile", body = UserProfile),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn me(current: CurrentUser) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    require_role(&current, Operation::ReadProfile)?;
    Ok(Json(api_success(UserProfile::from(&*current))))
}

/// Update the caller's own profile fields
#[utoipa::path(
    put,
    path = crate::routes::paths::auth::ME,
    tag = "authentication",
    security(("bearer_auth" = [])),
    request_body = UserUpdate,
    responses(
        (status = 200, description = "Updated profile", body = UserProfile),
        (status = 400, description = "Invalid field value"),
        (status = 422, description = "Unknown or malformed field")
    )
)]
pub async fn update_me(
    State(server): State<PhrServer>,
    CurrentUser(mut user): CurrentUser,
    ApiJson(update): ApiJson<UserUpdate>,
) -> Result<Json<ApiResponse<UserProfile>>, ApiError> {
    require_role(&user, Operation::UpdateProfile)?;
    update.validate()?;

    update.apply(&mut user);
    let user = match server.stores.users.update(&user).await {
        Ok(user) => user,
        Err(StoreError::NotFound(_)) => return Err(ApiError::not_found("User")),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(api_success(UserProfile::from(&user))))
}

/// Stateless: clients discard their tokens
#[utoipa::path(
    post,
    path = crate::routes::paths::auth::LOGOUT,
    tag = "authentication",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(current: CurrentUser) -> Json<ApiResponse<MessageResponse>> {
    tracing::info!(user_id = %current.id, "User logged out");
    Json(api_success(MessageResponse::new("Successfully logged out")))
}

#[utoipa::path(
    get,
    path = crate::routes::paths::auth::VERIFY_TOKEN,
    tag = "authentication",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Token is valid", body = TokenVerification),
        (status = 401, description = "Token is invalid or expired")
    )
)]
pub async fn verify_token(current: CurrentUser) -> Json<ApiResponse<TokenVerification>> {
    Json(api_success(TokenVerification {
        valid: true,
        user_id: current.id,
        email: current.email.clone(),
        role: current.role,
    }))
}
