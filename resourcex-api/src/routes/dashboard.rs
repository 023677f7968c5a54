/// Dashboard statistics endpoint
///
/// Aggregates resource statistics within the caller's visibility scope,
/// plus global user statistics for administrators. Non-admins receive
/// `userStats: null` rather than an error so the dashboard renders for
/// everyone.
///
/// # Endpoint
///
/// ```text
/// GET /v1/dashboard
/// ```
///
/// # Response
///
/// ```json
/// {
///   "resourceStats": {
///     "totalResources": 12,
///     "byStatus": { "pending": 5, "completed": 7 },
///     "byPriority": { "high": 3, "medium": 9 },
///     "byType": { "task": 12 },
///     "overdue": 2,
///     "recentActivity": [ ... ]
///   },
///   "userStats": null,
///   "monthlyData": { "1": 0, "2": 3, ... },
///   "isAdmin": false
/// }
/// ```
use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Extension, Json};
use resourcex_shared::{
    auth::middleware::AuthContext,
    models::{
        resource::{Resource, ResourceStats},
        user::UserStats,
    },
    scope::VisibilityScope,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Dashboard response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    /// Resource statistics within the caller's visible scope
    pub resource_stats: ResourceStats,

    /// Global user statistics; null for non-administrators
    pub user_stats: Option<UserStats>,

    /// Resources created per month of the current year, zero-filled
    pub monthly_data: BTreeMap<u32, i64>,

    /// Whether the caller holds the Administrator role
    pub is_admin: bool,
}

/// Dashboard handler
///
/// The statistics are computed from independent reads at request time, so
/// under concurrent writes the sections may reflect slightly different
/// instants. Within one query the counts are consistent: grouped counts sum
/// to the total.
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DashboardResponse>> {
    let scope = VisibilityScope::for_resources(&auth);
    let is_admin = auth.is_admin();

    let resource_stats = ResourceStats::compute(&state.db, &scope, state.overdue_policy()).await?;
    let monthly_data = Resource::monthly_created(&state.db, &scope).await?;

    let user_stats = if is_admin {
        Some(UserStats::compute(&state.db).await?)
    } else {
        None
    };

    Ok(Json(DashboardResponse {
        resource_stats,
        user_stats,
        monthly_data,
        is_admin,
    }))
}
