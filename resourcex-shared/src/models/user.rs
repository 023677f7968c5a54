/// User model and database operations
///
/// Users own resources (as creator) and may be assigned resources. Role
/// membership (see [`crate::models::role`]) drives the access scoping
/// policy. An account with `email_verified_at` set is "active"; one without
/// is "invited".
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     uuid UUID NOT NULL UNIQUE,
///     name VARCHAR(255) NOT NULL,
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     email_verified_at TIMESTAMPTZ,
///     verification_token UUID,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::query::{Page, PageMeta, PageParams, QueryError, SortOrder};

/// Number of users returned in the recent-registrations feed
const RECENT_REGISTRATIONS: i64 = 5;

const USER_COLUMNS: &str = "id, uuid, name, email, password_hash, \
                            email_verified_at, verification_token, created_at, updated_at";

/// User model representing an account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Surrogate user id
    pub id: i64,

    /// External UUID (token subject, never reused)
    pub uuid: Uuid,

    /// Display name
    pub name: String,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id password hash, opaque to this core
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// When the email was verified (None = invited, not yet active)
    pub email_verified_at: Option<DateTime<Utc>>,

    /// Pending email verification token (None once verified)
    #[serde(skip_serializing)]
    pub verification_token: Option<Uuid>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Display name
    pub name: String,

    /// Email address (must be unique)
    pub email: String,

    /// Argon2id password hash (never a plaintext password)
    pub password_hash: String,
}

/// Allowlisted sort columns for user listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserSortField {
    Name,
    Email,
    #[default]
    CreatedAt,
}

impl UserSortField {
    /// Parses a sort field from its wire representation
    ///
    /// Accepts both camelCase and snake_case spellings.
    pub fn parse(value: &str) -> Result<Self, QueryError> {
        match value {
            "name" => Ok(UserSortField::Name),
            "email" => Ok(UserSortField::Email),
            "createdAt" | "created_at" => Ok(UserSortField::CreatedAt),
            other => Err(QueryError::UnknownSortField(other.to_string())),
        }
    }

    /// Column name for ORDER BY
    pub fn column(&self) -> &'static str {
        match self {
            UserSortField::Name => "name",
            UserSortField::Email => "email",
            UserSortField::CreatedAt => "created_at",
        }
    }
}

/// Filter specification for user listings
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive substring match against name or email
    pub search: Option<String>,

    /// Restrict to users holding this role name
    pub role: Option<String>,

    /// Sort column (default created_at)
    pub sort_by: UserSortField,

    /// Sort direction (default desc)
    pub sort_order: SortOrder,
}

impl UserFilter {
    /// Appends this filter's predicates to a query
    ///
    /// The query must already contain a WHERE clause.
    fn push_predicates(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            qb.push(" AND (users.name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR users.email ILIKE ")
                .push_bind(pattern)
                .push(")");
        }

        if let Some(role) = self.role.as_deref().filter(|r| !r.is_empty()) {
            qb.push(
                " AND EXISTS (SELECT 1 FROM user_roles ur \
                 JOIN roles r ON r.id = ur.role_id \
                 WHERE ur.user_id = users.id AND r.name = ",
            )
            .push_bind(role.to_string())
            .push(")");
        }
    }
}

/// A user expanded with role names, as exposed to clients
///
/// Serialization is camelCase and never includes the password hash or the
/// verification token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserWithRoles {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<String>,
}

/// Minimal user record for assignment dropdowns
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AssignableUser {
    pub id: i64,
    pub uuid: Uuid,
    pub name: String,
    pub email: String,
}

/// Active/invited breakdown for user statistics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStatusCounts {
    /// Users with a verified email
    pub active: i64,

    /// Users not yet verified
    pub invited: i64,
}

/// User statistics for the administrator dashboard
///
/// Computed at request time from independent reads; not a single consistent
/// snapshot under concurrent writes.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    /// Total user count
    pub total_users: i64,

    /// Count per role name; a user with several roles is counted once per
    /// role, so these buckets are not mutually exclusive
    pub by_role: BTreeMap<String, i64>,

    /// Active vs invited breakdown
    pub by_status: UserStatusCounts,

    /// The five most recently created users with their roles
    pub recent_registrations: Vec<UserWithRoles>,
}

impl User {
    /// Creates a new user
    ///
    /// A fresh external UUID and email verification token are generated.
    ///
    /// # Errors
    ///
    /// Returns a database error on failure; a duplicate email surfaces as a
    /// unique constraint violation.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (uuid, name, email, password_hash, verification_token) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(data.name)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(Uuid::new_v4())
            .fetch_one(pool)
            .await
    }

    /// Finds a user by surrogate id
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by external UUID
    pub async fn find_by_uuid(pool: &PgPool, uuid: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE uuid = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(uuid)
            .fetch_optional(pool)
            .await
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Verifies an email address by its verification token
    ///
    /// Sets `email_verified_at` and clears the token. Returns `None` if the
    /// token is unknown or already consumed.
    pub async fn verify_email(pool: &PgPool, token: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users \
             SET email_verified_at = NOW(), verification_token = NULL, updated_at = NOW() \
             WHERE verification_token = $1 AND email_verified_at IS NULL \
             RETURNING {USER_COLUMNS}"
        );

        sqlx::query_as::<_, User>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Lists users with filters, sorting, and pagination
    ///
    /// Administrator-only at the API boundary; this function itself applies
    /// no visibility scope because the user collection is never narrowed.
    pub async fn list(
        pool: &PgPool,
        filter: &UserFilter,
        page: &PageParams,
    ) -> Result<Page<UserWithRoles>, sqlx::Error> {
        // Total matching count
        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE TRUE");
        filter.push_predicates(&mut count_qb);
        let (total,): (i64,) = count_qb.build_query_as().fetch_one(pool).await?;

        // Page of users
        let mut qb = QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE TRUE"));
        filter.push_predicates(&mut qb);
        qb.push(format!(
            " ORDER BY users.{} {}, users.id ASC",
            filter.sort_by.column(),
            filter.sort_order.as_sql()
        ));
        qb.push(" LIMIT ")
            .push_bind(page.per_page())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let users: Vec<User> = qb.build_query_as().fetch_all(pool).await?;
        let data = Self::attach_roles(pool, users).await?;

        Ok(Page {
            data,
            pagination: PageMeta::new(total, page),
        })
    }

    /// Gets users for the assignment dropdown
    pub async fn for_assignment(pool: &PgPool) -> Result<Vec<AssignableUser>, sqlx::Error> {
        sqlx::query_as::<_, AssignableUser>(
            "SELECT id, uuid, name, email FROM users ORDER BY name ASC, id ASC",
        )
        .fetch_all(pool)
        .await
    }

    /// Expands users with their role names in one additional query
    async fn attach_roles(
        pool: &PgPool,
        users: Vec<User>,
    ) -> Result<Vec<UserWithRoles>, sqlx::Error> {
        let ids: Vec<i64> = users.iter().map(|u| u.id).collect();

        let mut roles_by_user: HashMap<i64, Vec<String>> = HashMap::new();
        if !ids.is_empty() {
            let rows: Vec<(i64, String)> = sqlx::query_as(
                r#"
                SELECT ur.user_id, r.name
                FROM user_roles ur
                JOIN roles r ON r.id = ur.role_id
                WHERE ur.user_id = ANY($1)
                ORDER BY r.name
                "#,
            )
            .bind(&ids)
            .fetch_all(pool)
            .await?;

            for (user_id, role_name) in rows {
                roles_by_user.entry(user_id).or_default().push(role_name);
            }
        }

        Ok(users
            .into_iter()
            .map(|user| {
                let roles = roles_by_user.remove(&user.id).unwrap_or_default();
                UserWithRoles {
                    id: user.id,
                    uuid: user.uuid,
                    name: user.name,
                    email: user.email,
                    email_verified_at: user.email_verified_at,
                    created_at: user.created_at,
                    roles,
                }
            })
            .collect())
    }
}

impl UserStats {
    /// Computes user statistics for the administrator dashboard
    ///
    /// Issues independent reads (count, role distribution, status breakdown,
    /// recent registrations); under concurrent writes the pieces may reflect
    /// slightly different points in time.
    pub async fn compute(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        let role_rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT r.name, COUNT(*) AS count
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            GROUP BY r.name
            "#,
        )
        .fetch_all(pool)
        .await?;
        let by_role = role_rows.into_iter().collect();

        let (active, invited): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FILTER (WHERE email_verified_at IS NOT NULL),
                   COUNT(*) FILTER (WHERE email_verified_at IS NULL)
            FROM users
            "#,
        )
        .fetch_one(pool)
        .await?;

        let recent_query = format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC LIMIT $1"
        );
        let recent: Vec<User> = sqlx::query_as(&recent_query)
            .bind(RECENT_REGISTRATIONS)
            .fetch_all(pool)
            .await?;
        let recent_registrations = User::attach_roles(pool, recent).await?;

        Ok(Self {
            total_users,
            by_role,
            by_status: UserStatusCounts { active, invited },
            recent_registrations,
        })
    }
}
