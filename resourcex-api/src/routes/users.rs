/// User collection endpoints
///
/// Listing and statistics are administrator-only and never narrowed for
/// other callers; non-admins receive 403. The assignment listing is open to
/// every authenticated user so they can pick an assignee.
///
/// # Endpoints
///
/// - `GET /v1/users` - Paginated user list (admin only)
/// - `GET /v1/users/stats` - User statistics (admin only)
/// - `GET /v1/users/assignment` - Assignable users (authenticated)
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use resourcex_shared::{
    auth::middleware::AuthContext,
    models::user::{AssignableUser, User, UserFilter, UserSortField, UserStats, UserWithRoles},
    query::{Page, PageParams, QueryError, SortOrder},
    scope::VisibilityScope,
};
use serde::Deserialize;

/// Raw listing query parameters as they arrive on the wire
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    /// Substring search over name and email
    pub search: Option<String>,

    /// Restrict to users holding this role name
    pub role: Option<String>,

    /// Sort column
    pub sort_by: Option<String>,

    /// Sort direction ("asc"/"desc")
    pub sort_order: Option<String>,

    /// 1-based page number
    pub page: Option<i64>,

    /// Page size (1..=100)
    pub per_page: Option<i64>,
}

impl ListUsersQuery {
    fn into_parts(self) -> Result<(UserFilter, PageParams), QueryError> {
        let filter = UserFilter {
            search: self.search,
            role: self.role,
            sort_by: self
                .sort_by
                .as_deref()
                .map(UserSortField::parse)
                .transpose()?
                .unwrap_or_default(),
            sort_order: self
                .sort_order
                .as_deref()
                .map(SortOrder::parse)
                .transpose()?
                .unwrap_or_default(),
        };

        let page = PageParams::new(self.page, self.per_page)?;

        Ok((filter, page))
    }
}

/// List users (admin only)
///
/// # Errors
///
/// - `403 Forbidden`: Caller lacks the Administrator role
/// - `422 Unprocessable Entity`: Invalid filter, sort, or page parameters
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Page<UserWithRoles>>> {
    VisibilityScope::require_admin(&auth)?;

    let (filter, page) = query.into_parts()?;
    let page = User::list(&state.db, &filter, &page).await?;

    Ok(Json(page))
}

/// User statistics (admin only)
///
/// # Errors
///
/// - `403 Forbidden`: Caller lacks the Administrator role
pub async fn user_stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<UserStats>> {
    VisibilityScope::require_admin(&auth)?;

    let stats = UserStats::compute(&state.db).await?;

    Ok(Json(stats))
}

/// Assignable users
///
/// Minimal user records for assignment pickers, available to every
/// authenticated caller.
pub async fn users_for_assignment(
    State(state): State<AppState>,
    Extension(_auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<AssignableUser>>> {
    let users = User::for_assignment(&state.db).await?;

    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_conversion() {
        let query = ListUsersQuery {
            search: Some("jane".to_string()),
            role: Some("Administrator".to_string()),
            sort_by: Some("email".to_string()),
            sort_order: Some("asc".to_string()),
            ..Default::default()
        };

        let (filter, page) = query.into_parts().unwrap();
        assert_eq!(filter.search.as_deref(), Some("jane"));
        assert_eq!(filter.role.as_deref(), Some("Administrator"));
        assert_eq!(filter.sort_by, UserSortField::Email);
        assert_eq!(filter.sort_order, SortOrder::Asc);
        assert_eq!(page.page(), 1);
    }

    #[test]
    fn test_list_query_rejects_unknown_sort() {
        let query = ListUsersQuery {
            sort_by: Some("password_hash".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_parts(),
            Err(QueryError::UnknownSortField(_))
        ));
    }
}
