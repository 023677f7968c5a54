/// Resource CRUD endpoints
///
/// All endpoints require authentication. Listing is narrowed by the caller's
/// visibility scope; single-record reads are allowed for the owner, the
/// assignee, and administrators; mutation is allowed for the owner and
/// administrators only.
///
/// # Endpoints
///
/// - `GET /v1/resources` - List with filters, sorting, and pagination
/// - `POST /v1/resources` - Create (caller becomes owner)
/// - `GET /v1/resources/:uuid` - Show
/// - `PUT /v1/resources/:uuid` - Partial update (owner or admin)
/// - `DELETE /v1/resources/:uuid` - Soft delete (owner or admin)
///
/// # Query parameters (listing)
///
/// ```text
/// GET /v1/resources?status=pending,in_progress&priority=high&type=task
///     &search=report&assignedTo=4&sortBy=dueDate&sortOrder=asc&page=2&perPage=20
/// ```
///
/// `status` and `priority` accept comma-separated multi-values matched with
/// OR; all distinct filters combine with AND.
use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use resourcex_shared::{
    auth::middleware::AuthContext,
    models::{
        resource::{
            CreateResource, Resource, ResourceFilter, ResourcePriority, ResourceSortField,
            ResourceStatus, ResourceType, ResourceWithUsers, UpdateResource,
        },
        user::User,
    },
    query::{parse_multi, Page, PageParams, QueryError, SortOrder},
    scope::VisibilityScope,
};
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

/// Raw listing query parameters as they arrive on the wire
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResourcesQuery {
    /// Substring search over name, description, and tags
    pub search: Option<String>,

    /// Comma-separated statuses
    pub status: Option<String>,

    /// Comma-separated priorities
    pub priority: Option<String>,

    /// Single type
    #[serde(rename = "type")]
    pub resource_type: Option<String>,

    /// Assignee user id
    pub assigned_to: Option<i64>,

    /// Sort column
    pub sort_by: Option<String>,

    /// Sort direction ("asc"/"desc")
    pub sort_order: Option<String>,

    /// 1-based page number
    pub page: Option<i64>,

    /// Page size (1..=100)
    pub per_page: Option<i64>,
}

impl ListResourcesQuery {
    /// Validates and converts the raw parameters into a typed filter and
    /// page parameters
    fn into_parts(self) -> Result<(ResourceFilter, PageParams), QueryError> {
        let filter = ResourceFilter {
            search: self.search,
            status: parse_multi(self.status.as_deref(), ResourceStatus::parse)?,
            priority: parse_multi(self.priority.as_deref(), ResourcePriority::parse)?,
            resource_type: self
                .resource_type
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(ResourceType::parse)
                .transpose()?,
            assigned_to: self.assigned_to,
            sort_by: self
                .sort_by
                .as_deref()
                .map(ResourceSortField::parse)
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

/// Create resource request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateResourceRequest {
    /// Resource name
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    /// Optional description
    pub description: Option<String>,

    /// Category (default "other")
    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,

    /// Lifecycle status (default "pending")
    pub status: Option<ResourceStatus>,

    /// Priority (default "medium")
    pub priority: Option<ResourcePriority>,

    /// Assigned user id
    pub assignee_id: Option<i64>,

    /// Due date
    pub due_date: Option<DateTime<Utc>>,

    /// Tags
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Update resource request
///
/// Absent fields are left untouched. For the nullable fields (description,
/// assigneeId, dueDate) an explicit JSON `null` clears the value, which is
/// distinct from omitting the field.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateResourceRequest {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(rename = "type")]
    pub resource_type: Option<ResourceType>,

    pub status: Option<ResourceStatus>,

    pub priority: Option<ResourcePriority>,

    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<i64>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    pub tags: Option<Vec<String>>,
}

/// Deserializes a present-but-possibly-null field as `Some(Option<T>)`
///
/// With `#[serde(default)]` an absent field stays `None`, so the outer
/// option tracks field presence and the inner one nullability.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Checks that an assignee id refers to an existing user
async fn check_assignee(state: &AppState, assignee_id: i64) -> Result<(), ApiError> {
    User::find_by_id(&state.db, assignee_id)
        .await?
        .map(|_| ())
        .ok_or_else(|| ApiError::field_error("assigneeId", "Assignee does not exist"))
}

/// Whether the caller may read this resource
fn can_view(auth: &AuthContext, resource: &ResourceWithUsers) -> bool {
    auth.is_admin()
        || resource.owner.id == auth.user_id
        || resource.assignee.as_ref().is_some_and(|a| a.id == auth.user_id)
}

/// Whether the caller may modify or delete this resource
///
/// Assignees can read but not mutate.
fn can_modify(auth: &AuthContext, resource: &Resource) -> bool {
    auth.is_admin() || resource.owner_id == auth.user_id
}

/// List resources
///
/// Returns a page of resources visible to the caller, after applying the
/// requested filters and sort. A page past the end returns empty data with
/// accurate pagination metadata.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Invalid filter, sort, or page parameters
pub async fn list_resources(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListResourcesQuery>,
) -> ApiResult<Json<Page<ResourceWithUsers>>> {
    let (filter, page) = query.into_parts()?;
    let scope = VisibilityScope::for_resources(&auth);

    let page = Resource::list(&state.db, &scope, &filter, &page).await?;

    Ok(Json(page))
}

/// Create a resource
///
/// The caller becomes the owner; ownership never changes afterwards.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed or assignee unknown
pub async fn create_resource(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateResourceRequest>,
) -> ApiResult<(StatusCode, Json<ResourceWithUsers>)> {
    req.validate().map_err(validation_details)?;

    if let Some(assignee_id) = req.assignee_id {
        check_assignee(&state, assignee_id).await?;
    }

    let resource = Resource::create(
        &state.db,
        CreateResource {
            name: req.name,
            description: req.description,
            resource_type: req.resource_type.unwrap_or(ResourceType::Other),
            status: req.status.unwrap_or(ResourceStatus::Pending),
            priority: req.priority.unwrap_or(ResourcePriority::Medium),
            owner_id: auth.user_id,
            assignee_id: req.assignee_id,
            due_date: req.due_date,
            tags: req.tags,
        },
    )
    .await?;

    tracing::info!(resource = %resource.uuid, owner = auth.user_id, "Resource created");

    let expanded = Resource::find_with_users_by_id(&state.db, resource.id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Created resource vanished".to_string()))?;

    Ok((StatusCode::CREATED, Json(expanded)))
}

/// Show a single resource
///
/// # Errors
///
/// - `404 Not Found`: Unknown UUID or soft-deleted resource
/// - `403 Forbidden`: Caller is neither owner, assignee, nor administrator
pub async fn show_resource(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<Json<ResourceWithUsers>> {
    let resource = Resource::find_with_users_by_uuid(&state.db, uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    if !can_view(&auth, &resource) {
        return Err(ApiError::Forbidden(
            "Not authorized to access this resource".to_string(),
        ));
    }

    Ok(Json(resource))
}

/// Update a resource
///
/// Partial update; only supplied fields change. The owner field is not
/// updatable.
///
/// # Errors
///
/// - `404 Not Found`: Unknown UUID or soft-deleted resource
/// - `403 Forbidden`: Caller is neither owner nor administrator
/// - `422 Unprocessable Entity`: Validation failed or assignee unknown
pub async fn update_resource(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(uuid): Path<Uuid>,
    Json(req): Json<UpdateResourceRequest>,
) -> ApiResult<Json<ResourceWithUsers>> {
    req.validate().map_err(validation_details)?;

    let resource = Resource::find_by_uuid(&state.db, uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    if !can_modify(&auth, &resource) {
        return Err(ApiError::Forbidden(
            "Not authorized to modify this resource".to_string(),
        ));
    }

    if let Some(Some(assignee_id)) = req.assignee_id {
        check_assignee(&state, assignee_id).await?;
    }

    let updated = Resource::update(
        &state.db,
        resource.id,
        UpdateResource {
            name: req.name,
            description: req.description,
            resource_type: req.resource_type,
            status: req.status,
            priority: req.priority,
            assignee_id: req.assignee_id,
            due_date: req.due_date,
            tags: req.tags,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    let expanded = Resource::find_with_users_by_id(&state.db, updated.id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Updated resource vanished".to_string()))?;

    Ok(Json(expanded))
}

/// Soft-delete a resource
///
/// The record is marked deleted and disappears from all listings and
/// statistics immediately.
///
/// # Errors
///
/// - `404 Not Found`: Unknown UUID or already-deleted resource
/// - `403 Forbidden`: Caller is neither owner nor administrator
pub async fn delete_resource(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(uuid): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let resource = Resource::find_by_uuid(&state.db, uuid)
        .await?
        .ok_or_else(|| ApiError::NotFound("Resource not found".to_string()))?;

    if !can_modify(&auth, &resource) {
        return Err(ApiError::Forbidden(
            "Not authorized to delete this resource".to_string(),
        ));
    }

    let deleted = Resource::soft_delete(&state.db, resource.id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Resource not found".to_string()));
    }

    tracing::info!(resource = %uuid, "Resource soft-deleted");

    Ok(StatusCode::NO_CONTENT)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_parses_multi_values() {
        let query = ListResourcesQuery {
            status: Some("completed,cancelled".to_string()),
            priority: Some("high".to_string()),
            resource_type: Some("task".to_string()),
            sort_by: Some("dueDate".to_string()),
            sort_order: Some("asc".to_string()),
            page: Some(2),
            per_page: Some(20),
            ..Default::default()
        };

        let (filter, page) = query.into_parts().unwrap();
        assert_eq!(
            filter.status,
            vec![ResourceStatus::Completed, ResourceStatus::Cancelled]
        );
        assert_eq!(filter.priority, vec![ResourcePriority::High]);
        assert_eq!(filter.resource_type, Some(ResourceType::Task));
        assert_eq!(filter.sort_by, ResourceSortField::DueDate);
        assert_eq!(filter.sort_order, SortOrder::Asc);
        assert_eq!(page.page(), 2);
        assert_eq!(page.per_page(), 20);
    }

    #[test]
    fn test_list_query_rejects_bad_values() {
        let query = ListResourcesQuery {
            status: Some("archived".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            query.into_parts(),
            Err(QueryError::InvalidFilterValue { field: "status", .. })
        ));

        let query = ListResourcesQuery {
            per_page: Some(0),
            ..Default::default()
        };
        assert!(matches!(query.into_parts(), Err(QueryError::InvalidPerPage)));
    }

    #[test]
    fn test_update_request_distinguishes_absent_from_null() {
        let req: UpdateResourceRequest =
            serde_json::from_str(r#"{"assigneeId": null, "name": "renamed"}"#).unwrap();
        assert_eq!(req.assignee_id, Some(None));
        assert_eq!(req.due_date, None);
        assert_eq!(req.name.as_deref(), Some("renamed"));

        let req: UpdateResourceRequest = serde_json::from_str(r#"{"assigneeId": 7}"#).unwrap();
        assert_eq!(req.assignee_id, Some(Some(7)));
    }

    #[test]
    fn test_assignee_may_view_but_not_modify() {
        let owner = AuthContext::new(1, Uuid::new_v4(), vec!["Regular User".to_string()]);
        let assignee = AuthContext::new(2, Uuid::new_v4(), vec!["Regular User".to_string()]);
        let stranger = AuthContext::new(3, Uuid::new_v4(), vec!["Regular User".to_string()]);
        let admin = AuthContext::new(4, Uuid::new_v4(), vec!["Administrator".to_string()]);

        let expanded = ResourceWithUsers {
            id: 1,
            uuid: Uuid::new_v4(),
            name: "n".to_string(),
            description: None,
            resource_type: ResourceType::Task,
            status: ResourceStatus::Pending,
            priority: ResourcePriority::Medium,
            owner: resourcex_shared::models::resource::UserRef {
                id: 1,
                name: "o".to_string(),
                email: "o@example.com".to_string(),
            },
            assignee: Some(resourcex_shared::models::resource::UserRef {
                id: 2,
                name: "a".to_string(),
                email: "a@example.com".to_string(),
            }),
            due_date: None,
            tags: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(can_view(&owner, &expanded));
        assert!(can_view(&assignee, &expanded));
        assert!(can_view(&admin, &expanded));
        assert!(!can_view(&stranger, &expanded));

        let raw = Resource {
            id: 1,
            uuid: expanded.uuid,
            name: "n".to_string(),
            description: None,
            resource_type: ResourceType::Task,
            status: ResourceStatus::Pending,
            priority: ResourcePriority::Medium,
            owner_id: 1,
            assignee_id: Some(2),
            due_date: None,
            tags: sqlx::types::Json(vec![]),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        };

        assert!(can_modify(&owner, &raw));
        assert!(!can_modify(&assignee, &raw));
        assert!(can_modify(&admin, &raw));
        assert!(!can_modify(&stranger, &raw));
    }
}
