/// Authentication endpoints
///
/// This module provides user authentication endpoints:
/// - Registration (with email verification token issuance)
/// - Login
/// - Token refresh
/// - Email verification
/// - Current user lookup
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register new user
/// - `POST /v1/auth/login` - Login and get tokens
/// - `POST /v1/auth/refresh` - Refresh access token
/// - `GET /v1/auth/verify-email/:token` - Verify email address
/// - `GET /v1/me` - Current authenticated user
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use resourcex_shared::{
    auth::{jwt, middleware::AuthContext, password},
    models::{
        role::Role,
        user::{CreateUser, User, UserWithRoles},
    },
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Role granted to every new registration
const DEFAULT_ROLE: &str = "Regular User";

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (will be validated for strength)
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Register / login response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// The authenticated user with role names
    pub user: UserWithRoles,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

/// Email verification response
#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    /// Confirmation message
    pub message: String,
}

/// Maps validator failures onto per-field validation details
fn validation_details(errors: validator::ValidationErrors) -> ApiError {
    let details: Vec<ValidationErrorDetail> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| ValidationErrorDetail {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Validation failed".to_string()),
            })
        })
        .collect();
    ApiError::ValidationError(details)
}

/// Issues an access/refresh token pair for a user
fn issue_tokens(state: &AppState, user_uuid: Uuid) -> Result<(String, String), ApiError> {
    let access_claims = jwt::Claims::new(user_uuid, jwt::TokenType::Access);
    let refresh_claims = jwt::Claims::new(user_uuid, jwt::TokenType::Refresh);

    let access_token = jwt::create_token(&access_claims, state.jwt_secret())?;
    let refresh_token = jwt::create_token(&refresh_claims, state.jwt_secret())?;

    Ok((access_token, refresh_token))
}

/// Register a new user
///
/// Creates the account, grants the default role, and issues tokens. The
/// account starts unverified; a verification token is generated and would be
/// delivered by email out of band.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email already exists
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    req.validate().map_err(validation_details)?;

    password::validate_password_strength(&req.password)
        .map_err(|message| ApiError::field_error("password", message))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name,
            email: req.email,
            password_hash,
        },
    )
    .await?;

    let role = Role::find_by_name(&state.db, DEFAULT_ROLE)
        .await?
        .ok_or_else(|| ApiError::InternalError(format!("Role {} is not seeded", DEFAULT_ROLE)))?;
    Role::assign(&state.db, role.id, user.id).await?;

    // Email delivery is out of band; surface the token in the logs so local
    // setups can complete verification without a mail server.
    tracing::info!(
        user = %user.uuid,
        token = ?user.verification_token,
        "Registered new user, verification pending"
    );

    let (access_token, refresh_token) = issue_tokens(&state, user.uuid)?;

    let response = AuthResponse {
        user: UserWithRoles {
            id: user.id,
            uuid: user.uuid,
            name: user.name,
            email: user.email,
            email_verified_at: user.email_verified_at,
            created_at: user.created_at,
            roles: vec![role.name],
        },
        access_token,
        refresh_token,
    };

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login endpoint
///
/// Authenticates a user by email and password and returns JWT tokens.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `401 Unauthorized`: Invalid credentials
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate().map_err(validation_details)?;

    // Same error for unknown email and wrong password
    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid email or password".to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let roles = Role::names_for_user(&state.db, user.id).await?;
    let (access_token, refresh_token) = issue_tokens(&state, user.uuid)?;

    Ok(Json(AuthResponse {
        user: UserWithRoles {
            id: user.id,
            uuid: user.uuid,
            name: user.name,
            email: user.email,
            email_verified_at: user.email_verified_at,
            created_at: user.created_at,
            roles,
        },
        access_token,
        refresh_token,
    }))
}

/// Token refresh endpoint
///
/// Exchanges a refresh token for a new access token.
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}

/// Email verification endpoint
///
/// Consumes a verification token and activates the account. Tokens are
/// single-use; a second call with the same token returns 404.
///
/// # Errors
///
/// - `404 Not Found`: Unknown or already-consumed token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> ApiResult<Json<VerifyEmailResponse>> {
    let user = User::verify_email(&state.db, token)
        .await?
        .ok_or_else(|| ApiError::NotFound("Invalid verification token".to_string()))?;

    tracing::info!(user = %user.uuid, "Email verified");

    Ok(Json(VerifyEmailResponse {
        message: "Email verified successfully".to_string(),
    }))
}

/// Current user endpoint
///
/// Returns the authenticated caller with their role names.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserWithRoles>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(UserWithRoles {
        id: user.id,
        uuid: user.uuid,
        name: user.name,
        email: user.email,
        email_verified_at: user.email_verified_at,
        created_at: user.created_at,
        roles: auth.roles,
    }))
}
