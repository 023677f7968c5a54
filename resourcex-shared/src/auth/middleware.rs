/// Request authentication and caller identity
///
/// This module resolves the caller identity for every protected request:
/// the Bearer token is validated, the user is loaded, and the user's role
/// names are attached so downstream scoping decisions are explicit
/// capability checks against an enumerated role set.
///
/// After successful authentication the [`AuthContext`] is inserted into
/// request extensions, where handlers extract it with Axum's `Extension`
/// extractor.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use resourcex_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {} (admin: {})", auth.user_id, auth.is_admin())
/// }
/// ```
use axum::http::{header, HeaderMap};
use sqlx::PgPool;
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError};
use crate::models::role::Role;
use crate::models::user::User;
use crate::scope::ADMIN_ROLE;

/// Error type for authentication failures
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header present
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a Bearer token
    #[error("Invalid authorization format: {0}")]
    InvalidFormat(String),

    /// Token failed validation
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// Token subject does not correspond to a known user
    #[error("Unknown user")]
    UnknownUser,

    /// Database lookup failed
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        AuthError::InvalidToken(err.to_string())
    }
}

/// Authenticated caller identity attached to request extensions
///
/// Roles are resolved from the database at authentication time, not embedded
/// in the token, so revoking a role takes effect on the next request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Surrogate user id (database key, used in visibility predicates)
    pub user_id: i64,

    /// External user UUID (token subject)
    pub user_uuid: Uuid,

    /// Names of all roles held by the caller
    pub roles: Vec<String>,
}

impl AuthContext {
    /// Creates an auth context from resolved identity data
    pub fn new(user_id: i64, user_uuid: Uuid, roles: Vec<String>) -> Self {
        Self {
            user_id,
            user_uuid,
            roles,
        }
    }

    /// Checks whether the caller holds the named role
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r == name)
    }

    /// Checks whether the caller holds the Administrator role
    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

/// Authenticates a request from its headers
///
/// Extracts the Bearer token, validates it as an access token, loads the
/// user by the token's subject UUID, and resolves the user's role names.
///
/// # Errors
///
/// - `AuthError::MissingCredentials` if no Authorization header is present
/// - `AuthError::InvalidFormat` if the header is not `Bearer <token>`
/// - `AuthError::InvalidToken` if the token fails validation
/// - `AuthError::UnknownUser` if the subject does not exist
pub async fn authenticate(
    pool: &PgPool,
    jwt_secret: &str,
    headers: &HeaderMap,
) -> Result<AuthContext, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?;

    let claims = validate_access_token(token, jwt_secret)?;

    let user = User::find_by_uuid(pool, claims.sub)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    let roles = Role::names_for_user(pool, user.id)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

    Ok(AuthContext::new(user.id, user.uuid, roles))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_role() {
        let auth = AuthContext::new(
            1,
            Uuid::new_v4(),
            vec!["Regular User".to_string(), ADMIN_ROLE.to_string()],
        );
        assert!(auth.has_role("Regular User"));
        assert!(auth.is_admin());
    }

    #[test]
    fn test_non_admin() {
        let auth = AuthContext::new(2, Uuid::new_v4(), vec!["Regular User".to_string()]);
        assert!(!auth.is_admin());
        assert!(!auth.has_role("administrator")); // role names are case-sensitive
    }
}
