/// Role model
///
/// Roles are static reference data seeded by migration ("Administrator",
/// "Regular User") and linked to users through the `user_roles` join table.
/// Holding the Administrator role grants global visibility; everything else
/// is scoped to owned-or-assigned records.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A named permission group
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    /// Surrogate role id
    pub id: i64,

    /// Unique role name (e.g. "Administrator")
    pub name: String,

    /// Human-readable description
    pub description: Option<String>,

    /// When the role was created
    pub created_at: DateTime<Utc>,
}

impl Role {
    /// Finds a role by its unique name
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Assigns this role to a user
    ///
    /// Assigning a role the user already holds is a no-op.
    pub async fn assign(pool: &PgPool, role_id: i64, user_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(role_id)
        .execute(pool)
        .await?;

        Ok(())
    }

    /// Resolves the role names held by a user
    pub async fn names_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let names: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT r.name
            FROM user_roles ur
            JOIN roles r ON r.id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }
}
