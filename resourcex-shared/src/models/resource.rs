/// Resource model, filtered listing, and dashboard aggregation
///
/// A resource is the trackable unit of work in ResourceX: it has a type, a
/// status, a priority, an immutable owner (the creator), an optional
/// assignee, an optional due date, and a list of tags. Resources are
/// soft-deleted: `deleted_at` is set and every query and aggregation in this
/// module excludes marked rows.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE resource_type AS ENUM ('project', 'task', 'inventory', 'document', 'other');
/// CREATE TYPE resource_status AS ENUM ('pending', 'in_progress', 'completed', 'cancelled');
/// CREATE TYPE resource_priority AS ENUM ('low', 'medium', 'high', 'urgent');
///
/// CREATE TABLE resources (
///     id BIGSERIAL PRIMARY KEY,
///     uuid UUID NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     description TEXT,
///     type resource_type NOT NULL DEFAULT 'other',
///     status resource_status NOT NULL DEFAULT 'pending',
///     priority resource_priority NOT NULL DEFAULT 'medium',
///     owner_id BIGINT NOT NULL REFERENCES users(id),
///     assignee_id BIGINT REFERENCES users(id),
///     due_date TIMESTAMPTZ,
///     tags JSONB NOT NULL DEFAULT '[]',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::query::{Page, PageMeta, PageParams, QueryError, SortOrder};
use crate::scope::VisibilityScope;

/// Number of records in the recent-activity feed
const RECENT_ACTIVITY: i64 = 5;

const RESOURCE_COLUMNS: &str = "id, uuid, name, description, type, status, priority, \
                                owner_id, assignee_id, due_date, tags, \
                                created_at, updated_at, deleted_at";

/// Resource listing with owner/assignee display data joined in
const SELECT_WITH_USERS: &str = "\
    SELECT resources.id, resources.uuid, resources.name, resources.description, \
           resources.type, resources.status, resources.priority, \
           resources.due_date, resources.tags, resources.created_at, resources.updated_at, \
           owner_user.id AS owner_id, owner_user.name AS owner_name, owner_user.email AS owner_email, \
           assignee_user.id AS assignee_id, assignee_user.name AS assignee_name, \
           assignee_user.email AS assignee_email \
    FROM resources \
    JOIN users owner_user ON owner_user.id = resources.owner_id \
    LEFT JOIN users assignee_user ON assignee_user.id = resources.assignee_id";

/// Resource category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resource_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Project,
    Task,
    Inventory,
    Document,
    Other,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Project => "project",
            ResourceType::Task => "task",
            ResourceType::Inventory => "inventory",
            ResourceType::Document => "document",
            ResourceType::Other => "other",
        }
    }

    /// Parses a type from its wire representation
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value {
            "project" => Ok(ResourceType::Project),
            "task" => Ok(ResourceType::Task),
            "inventory" => Ok(ResourceType::Inventory),
            "document" => Ok(ResourceType::Document),
            "other" => Ok(ResourceType::Other),
            _ => Err(QueryError::InvalidFilterValue {
                field: "type",
                value: value.to_string(),
            }),
        }
    }
}

/// Resource lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resource_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ResourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceStatus::Pending => "pending",
            ResourceStatus::InProgress => "in_progress",
            ResourceStatus::Completed => "completed",
            ResourceStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its wire representation
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value {
            "pending" => Ok(ResourceStatus::Pending),
            "in_progress" => Ok(ResourceStatus::InProgress),
            "completed" => Ok(ResourceStatus::Completed),
            "cancelled" => Ok(ResourceStatus::Cancelled),
            _ => Err(QueryError::InvalidFilterValue {
                field: "status",
                value: value.to_string(),
            }),
        }
    }
}

/// Resource priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "resource_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResourcePriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl ResourcePriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourcePriority::Low => "low",
            ResourcePriority::Medium => "medium",
            ResourcePriority::High => "high",
            ResourcePriority::Urgent => "urgent",
        }
    }

    /// Parses a priority from its wire representation
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value {
            "low" => Ok(ResourcePriority::Low),
            "medium" => Ok(ResourcePriority::Medium),
            "high" => Ok(ResourcePriority::High),
            "urgent" => Ok(ResourcePriority::Urgent),
            _ => Err(QueryError::InvalidFilterValue {
                field: "priority",
                value: value.to_string(),
            }),
        }
    }
}

/// Resource model
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    /// Surrogate id
    pub id: i64,

    /// External UUID, assigned at creation, never reused
    pub uuid: Uuid,

    /// Resource name
    pub name: String,

    /// Optional free-text description
    pub description: Option<String>,

    /// Category
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub resource_type: ResourceType,

    /// Lifecycle status
    pub status: ResourceStatus,

    /// Priority
    pub priority: ResourcePriority,

    /// Creator; set once at creation and immutable
    pub owner_id: i64,

    /// Currently assigned user, if any
    pub assignee_id: Option<i64>,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Ordered list of tags
    pub tags: Json<Vec<String>>,

    /// When the resource was created
    pub created_at: DateTime<Utc>,

    /// When the resource was last updated
    pub updated_at: DateTime<Utc>,

    /// Soft-delete marker; set rows are excluded from every query
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Input for creating a new resource
#[derive(Debug, Clone)]
pub struct CreateResource {
    pub name: String,
    pub description: Option<String>,
    pub resource_type: ResourceType,
    pub status: ResourceStatus,
    pub priority: ResourcePriority,

    /// The creating user; becomes the immutable owner
    pub owner_id: i64,
    pub assignee_id: Option<i64>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Input for partially updating a resource
///
/// Only `Some` fields are written. Nullable columns use `Some(None)` to
/// clear. The owner cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct UpdateResource {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub resource_type: Option<ResourceType>,
    pub status: Option<ResourceStatus>,
    pub priority: Option<ResourcePriority>,
    pub assignee_id: Option<Option<i64>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub tags: Option<Vec<String>>,
}

/// Allowlisted sort columns for resource listings
///
/// Sort input is constrained to this set so arbitrary column names never
/// reach the ORDER BY clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceSortField {
    Name,
    Type,
    Status,
    Priority,
    DueDate,
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl ResourceSortField {
    /// Parses a sort field from its wire representation
    ///
    /// Accepts both camelCase and snake_case spellings.
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value {
            "name" => Ok(ResourceSortField::Name),
            "type" => Ok(ResourceSortField::Type),
            "status" => Ok(ResourceSortField::Status),
            "priority" => Ok(ResourceSortField::Priority),
            "dueDate" | "due_date" => Ok(ResourceSortField::DueDate),
            "createdAt" | "created_at" => Ok(ResourceSortField::CreatedAt),
            "updatedAt" | "updated_at" => Ok(ResourceSortField::UpdatedAt),
            other => Err(QueryError::UnknownSortField(other.to_string())),
        }
    }

    /// Column name for ORDER BY
    pub fn column(&self) -> &'static str {
        match self {
            ResourceSortField::Name => "name",
            ResourceSortField::Type => "type",
            ResourceSortField::Status => "status",
            ResourceSortField::Priority => "priority",
            ResourceSortField::DueDate => "due_date",
            ResourceSortField::CreatedAt => "created_at",
            ResourceSortField::UpdatedAt => "updated_at",
        }
    }
}

/// Filter specification for resource listings
///
/// Supplied filters combine with AND; the multi-value status and priority
/// filters match any of their values (OR). Empty values are ignored. The
/// caller's visibility scope is applied separately, before these filters.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    /// Case-insensitive substring match against name, description, or tags
    pub search: Option<String>,

    /// Match any of these statuses (empty = no status filter)
    pub status: Vec<ResourceStatus>,

    /// Match any of these priorities (empty = no priority filter)
    pub priority: Vec<ResourcePriority>,

    /// Match this type exactly
    pub resource_type: Option<ResourceType>,

    /// Match resources assigned to this user id
    pub assigned_to: Option<i64>,

    /// Sort column (default created_at)
    pub sort_by: ResourceSortField,

    /// Sort direction (default desc)
    pub sort_order: SortOrder,
}

impl ResourceFilter {
    /// Appends this filter's predicates to a query
    ///
    /// The query must already contain a WHERE clause.
    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            qb.push(" AND (resources.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR resources.description ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR resources.tags::text ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if !self.status.is_empty() {
            qb.push(" AND resources.status IN (");
            {
                let mut values = qb.separated(", ");
                for status in &self.status {
                    values.push_bind(*status);
                }
            }
            qb.push(")");
        }

        if !self.priority.is_empty() {
            qb.push(" AND resources.priority IN (");
            {
                let mut values = qb.separated(", ");
                for priority in &self.priority {
                    values.push_bind(*priority);
                }
            }
            qb.push(")");
        }

        if let Some(resource_type) = self.resource_type {
            qb.push(" AND resources.type = ").push_bind(resource_type);
        }

        if let Some(assigned_to) = self.assigned_to {
            qb.push(" AND resources.assignee_id = ").push_bind(assigned_to);
        }
    }

    /// ORDER BY clause for this filter (allowlisted column, id tie-break)
    ///
    /// Ties on the sort column would otherwise come back in whatever order
    /// the store returns; the id tie-break makes pages deterministic.
    fn order_clause(&self) -> String {
        format!(
            " ORDER BY resources.{} {}, resources.id ASC",
            self.sort_by.column(),
            self.sort_order.as_sql()
        )
    }
}

/// Owner/assignee display data exposed in place of raw foreign keys
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: i64,
    pub name: String,
    pub email: String,
}

/// A resource expanded with owner and assignee display data
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceWithUsers {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub status: ResourceStatus,
    pub priority: ResourcePriority,
    pub owner: UserRef,
    pub assignee: Option<UserRef>,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat row shape produced by [`SELECT_WITH_USERS`]
#[derive(Debug, sqlx::FromRow)]
struct ResourceWithUsersRow {
    id: i64,
    uuid: Uuid,
    name: String,
    description: Option<String>,
    #[sqlx(rename = "type")]
    resource_type: ResourceType,
    status: ResourceStatus,
    priority: ResourcePriority,
    due_date: Option<DateTime<Utc>>,
    tags: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_id: i64,
    owner_name: String,
    owner_email: String,
    assignee_id: Option<i64>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}

impl From<ResourceWithUsersRow> for ResourceWithUsers {
    fn from(row: ResourceWithUsersRow) -> Self {
        let assignee = match (row.assignee_id, row.assignee_name, row.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(UserRef { id, name, email }),
            _ => None,
        };

        Self {
            id: row.id,
            uuid: row.uuid,
            name: row.name,
            description: row.description,
            resource_type: row.resource_type,
            status: row.status,
            priority: row.priority,
            owner: UserRef {
                id: row.owner_id,
                name: row.owner_name,
                email: row.owner_email,
            },
            assignee,
            due_date: row.due_date,
            tags: row.tags.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Policy for what counts as overdue
///
/// A resource is overdue when its due date is set, strictly before now, and
/// its status is not completed. Whether cancelled resources still count is
/// ambiguous in practice, so it is configurable; the default keeps them
/// counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverduePolicy {
    /// Also exclude cancelled resources from the overdue count
    pub exclude_cancelled: bool,
}

impl OverduePolicy {
    /// Appends the overdue predicate to a query
    fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(
            " AND resources.due_date IS NOT NULL AND resources.due_date < NOW() \
             AND resources.status <> 'completed'",
        );
        if self.exclude_cancelled {
            qb.push(" AND resources.status <> 'cancelled'");
        }
    }
}

/// Resource statistics for the dashboard
///
/// Computed at request time from independent reads against the caller's
/// visible scope; not a single consistent snapshot under concurrent writes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStats {
    /// Total visible resource count
    pub total_resources: i64,

    /// Count per status, only for statuses present in at least one record
    pub by_status: BTreeMap<String, i64>,

    /// Count per priority, same shape
    pub by_priority: BTreeMap<String, i64>,

    /// Count per type, same shape
    pub by_type: BTreeMap<String, i64>,

    /// Overdue count per the configured [`OverduePolicy`]
    pub overdue: i64,

    /// The five most recently updated visible resources
    pub recent_activity: Vec<ResourceWithUsers>,
}

impl Resource {
    /// Creates a new resource
    ///
    /// A fresh external UUID is generated; the owner is set once here and
    /// never changes.
    pub async fn create(pool: &PgPool, data: CreateResource) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO resources \
             (uuid, name, description, type, status, priority, owner_id, assignee_id, due_date, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {RESOURCE_COLUMNS}"
        );

        sqlx::query_as::<_, Resource>(&query)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(data.description)
            .bind(data.resource_type)
            .bind(data.status)
            .bind(data.priority)
            .bind(data.owner_id)
            .bind(data.assignee_id)
            .bind(data.due_date)
            .bind(Json(data.tags))
            .fetch_one(pool)
            .await
    }

    /// Finds a resource by external UUID
    ///
    /// Soft-deleted resources are not found.
    pub async fn find_by_uuid(pool: &PgPool, uuid: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resources \
             WHERE uuid = $1 AND deleted_at IS NULL"
        );

        sqlx::query_as::<_, Resource>(&query)
            .bind(uuid)
            .fetch_optional(pool)
            .await
    }

    /// Finds a resource by external UUID with owner/assignee display data
    pub async fn find_with_users_by_uuid(
        pool: &PgPool,
        uuid: Uuid,
    ) -> Result<Option<ResourceWithUsers>, sqlx::Error> {
        let query = format!(
            "{SELECT_WITH_USERS} WHERE resources.uuid = $1 AND resources.deleted_at IS NULL"
        );

        let row = sqlx::query_as::<_, ResourceWithUsersRow>(&query)
            .bind(uuid)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(ResourceWithUsers::from))
    }

    /// Finds a resource by surrogate id with owner/assignee display data
    pub async fn find_with_users_by_id(
        pool: &PgPool,
        id: i64,
    ) -> Result<Option<ResourceWithUsers>, sqlx::Error> {
        let query = format!(
            "{SELECT_WITH_USERS} WHERE resources.id = $1 AND resources.deleted_at IS NULL"
        );

        let row = sqlx::query_as::<_, ResourceWithUsersRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(ResourceWithUsers::from))
    }

    /// Partially updates a resource
    ///
    /// Only supplied fields are written; `updated_at` is always touched.
    /// Returns `None` if the resource does not exist or is soft-deleted.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: UpdateResource,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut qb = QueryBuilder::new("UPDATE resources SET updated_at = NOW()");

        if let Some(name) = data.name {
            qb.push(", name = ").push_bind(name);
        }
        if let Some(description) = data.description {
            qb.push(", description = ").push_bind(description);
        }
        if let Some(resource_type) = data.resource_type {
            qb.push(", type = ").push_bind(resource_type);
        }
        if let Some(status) = data.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(priority) = data.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(assignee_id) = data.assignee_id {
            qb.push(", assignee_id = ").push_bind(assignee_id);
        }
        if let Some(due_date) = data.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(tags) = data.tags {
            qb.push(", tags = ").push_bind(Json(tags));
        }

        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(" AND deleted_at IS NULL")
            .push(format!(" RETURNING {RESOURCE_COLUMNS}"));

        qb.build_query_as::<Resource>().fetch_optional(pool).await
    }

    /// Soft-deletes a resource
    ///
    /// The row is marked, not removed; all subsequent queries and
    /// aggregations exclude it. Returns false if the resource was already
    /// deleted or never existed.
    pub async fn soft_delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE resources SET deleted_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists resources with scoping, filters, sorting, and pagination
    ///
    /// The visibility scope narrows the candidate set before the explicit
    /// filters are applied. A page past the end returns empty data with
    /// metadata still reflecting the true total.
    pub async fn list(
        pool: &PgPool,
        scope: &VisibilityScope,
        filter: &ResourceFilter,
        page: &PageParams,
    ) -> Result<Page<ResourceWithUsers>, sqlx::Error> {
        let mut count_qb =
            QueryBuilder::new("SELECT COUNT(*) FROM resources WHERE resources.deleted_at IS NULL");
        scope.push_predicate(&mut count_qb);
        filter.push_predicates(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

        let mut qb = QueryBuilder::new(format!(
            "{SELECT_WITH_USERS} WHERE resources.deleted_at IS NULL"
        ));
        scope.push_predicate(&mut qb);
        filter.push_predicates(&mut qb);
        qb.push(filter.order_clause());
        qb.push(" LIMIT ")
            .push_bind(page.per_page())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<ResourceWithUsersRow> = qb.build_query_as().fetch_all(pool).await?;
        let data = rows.into_iter().map(ResourceWithUsers::from).collect();

        Ok(Page {
            data,
            pagination: PageMeta::new(total, page),
        })
    }

    /// Monthly creation counts for the current year within a scope
    ///
    /// Returns a map with every month 1..=12 present, zero-filled.
    pub async fn monthly_created(
        pool: &PgPool,
        scope: &VisibilityScope,
    ) -> Result<BTreeMap<u32, i64>, sqlx::Error> {
        let mut qb = QueryBuilder::new(
            "SELECT EXTRACT(MONTH FROM resources.created_at)::INT AS month, COUNT(*) \
             FROM resources WHERE resources.deleted_at IS NULL \
             AND EXTRACT(YEAR FROM resources.created_at) = EXTRACT(YEAR FROM NOW())",
        );
        scope.push_predicate(&mut qb);
        qb.push(" GROUP BY month ORDER BY month");

        let rows: Vec<(i32, i64)> = qb.build_query_as().fetch_all(pool).await?;

        let mut by_month: BTreeMap<u32, i64> = (1..=12).map(|m| (m, 0)).collect();
        for (month, count) in rows {
            by_month.insert(month as u32, count);
        }

        Ok(by_month)
    }
}

impl ResourceStats {
    /// Computes dashboard statistics within a visibility scope
    ///
    /// Issues independent reads (total, three group-bys, overdue, recent
    /// activity); under concurrent writes the pieces may reflect slightly
    /// different points in time.
    pub async fn compute(
        pool: &PgPool,
        scope: &VisibilityScope,
        overdue_policy: OverduePolicy,
    ) -> Result<Self, sqlx::Error> {
        let mut total_qb =
            QueryBuilder::new("SELECT COUNT(*) FROM resources WHERE resources.deleted_at IS NULL");
        scope.push_predicate(&mut total_qb);
        let (total_resources,): (i64,) = total_qb.build_query_as().fetch_one(pool).await?;

        let by_status = Self::grouped_counts(pool, scope, "status").await?;
        let by_priority = Self::grouped_counts(pool, scope, "priority").await?;
        let by_type = Self::grouped_counts(pool, scope, "type").await?;

        let mut overdue_qb =
            QueryBuilder::new("SELECT COUNT(*) FROM resources WHERE resources.deleted_at IS NULL");
        scope.push_predicate(&mut overdue_qb);
        overdue_policy.push_predicate(&mut overdue_qb);
        let (overdue,): (i64,) = overdue_qb.build_query_as().fetch_one(pool).await?;

        let mut recent_qb = QueryBuilder::new(format!(
            "{SELECT_WITH_USERS} WHERE resources.deleted_at IS NULL"
        ));
        scope.push_predicate(&mut recent_qb);
        recent_qb
            .push(" ORDER BY resources.updated_at DESC, resources.id DESC LIMIT ")
            .push_bind(RECENT_ACTIVITY);
        let rows: Vec<ResourceWithUsersRow> = recent_qb.build_query_as().fetch_all(pool).await?;
        let recent_activity = rows.into_iter().map(ResourceWithUsers::from).collect();

        Ok(Self {
            total_resources,
            by_status,
            by_priority,
            by_type,
            overdue,
            recent_activity,
        })
    }

    /// Grouped counts over one enum column within a scope
    ///
    /// `column` must be one of the fixed enum column names; it is never
    /// caller-supplied.
    async fn grouped_counts(
        pool: &PgPool,
        scope: &VisibilityScope,
        column: &'static str,
    ) -> Result<BTreeMap<String, i64>, sqlx::Error> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT resources.{column}::TEXT, COUNT(*) \
             FROM resources WHERE resources.deleted_at IS NULL"
        ));
        scope.push_predicate(&mut qb);
        qb.push(format!(" GROUP BY resources.{column}"));

        let rows: Vec<(String, i64)> = qb.build_query_as().fetch_all(pool).await?;

        Ok(rows.into_iter().collect())
    }
}
