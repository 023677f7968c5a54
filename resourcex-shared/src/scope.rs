/// Access scoping policy
///
/// Determines, per request, whether a caller sees global data or only their
/// own/assigned subset. The policy is a pure function of the caller's
/// identity and the collection being queried; it renders itself into the SQL
/// of every listing and aggregation query before any explicit filters.
///
/// # Policy
///
/// - Callers holding the "Administrator" role see everything.
/// - Other callers see resources where they are the owner or the assignee.
/// - User listing and user statistics are administrator-only; non-admins get
///   an authorization error, never a narrowed result set.
///
/// # Example
///
/// ```
/// use resourcex_shared::auth::middleware::AuthContext;
/// use resourcex_shared::scope::VisibilityScope;
///
/// let admin = AuthContext::new(1, uuid::Uuid::new_v4(), vec!["Administrator".into()]);
/// assert!(matches!(VisibilityScope::for_resources(&admin), VisibilityScope::All));
///
/// let user = AuthContext::new(2, uuid::Uuid::new_v4(), vec!["Regular User".into()]);
/// assert!(matches!(VisibilityScope::for_resources(&user), VisibilityScope::Member(2)));
/// ```
use sqlx::{Postgres, QueryBuilder};

use crate::auth::middleware::AuthContext;

/// Role name that grants unrestricted visibility
pub const ADMIN_ROLE: &str = "Administrator";

/// Error type for scoping decisions
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    /// Caller lacks the Administrator role for an admin-only collection
    #[error("administrator role required")]
    AdminRequired,
}

/// Visibility predicate applied before all explicit filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityScope {
    /// Match all records (administrator)
    All,

    /// Match records owned by or assigned to this user id
    Member(i64),
}

impl VisibilityScope {
    /// Scope for resource queries based on the caller's roles
    pub fn for_resources(auth: &AuthContext) -> Self {
        if auth.is_admin() {
            VisibilityScope::All
        } else {
            VisibilityScope::Member(auth.user_id)
        }
    }

    /// Authorizes access to user listing/statistics collections
    ///
    /// These are never narrowed; non-administrators are rejected outright.
    pub fn require_admin(auth: &AuthContext) -> Result<(), ScopeError> {
        if auth.is_admin() {
            Ok(())
        } else {
            Err(ScopeError::AdminRequired)
        }
    }

    /// Appends this scope's predicate to a query
    ///
    /// The query must already contain a WHERE clause; the predicate is
    /// appended with AND. `VisibilityScope::All` appends nothing.
    pub fn push_predicate(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        match self {
            VisibilityScope::All => {}
            VisibilityScope::Member(user_id) => {
                qb.push(" AND (resources.owner_id = ")
                    .push_bind(*user_id)
                    .push(" OR resources.assignee_id = ")
                    .push_bind(*user_id)
                    .push(")");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn admin() -> AuthContext {
        AuthContext::new(1, Uuid::new_v4(), vec![ADMIN_ROLE.to_string()])
    }

    fn member(id: i64) -> AuthContext {
        AuthContext::new(id, Uuid::new_v4(), vec!["Regular User".to_string()])
    }

    #[test]
    fn test_admin_sees_all_resources() {
        assert_eq!(VisibilityScope::for_resources(&admin()), VisibilityScope::All);
    }

    #[test]
    fn test_member_is_scoped_to_own_records() {
        assert_eq!(
            VisibilityScope::for_resources(&member(7)),
            VisibilityScope::Member(7)
        );
    }

    #[test]
    fn test_user_collections_are_admin_only() {
        assert!(VisibilityScope::require_admin(&admin()).is_ok());
        assert!(matches!(
            VisibilityScope::require_admin(&member(7)),
            Err(ScopeError::AdminRequired)
        ));
    }

    #[test]
    fn test_all_scope_appends_nothing() {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM resources WHERE deleted_at IS NULL");
        VisibilityScope::All.push_predicate(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM resources WHERE deleted_at IS NULL"
        );
    }

    #[test]
    fn test_member_scope_appends_owner_or_assignee() {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM resources WHERE deleted_at IS NULL");
        VisibilityScope::Member(7).push_predicate(&mut qb);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM resources WHERE deleted_at IS NULL \
             AND (resources.owner_id = $1 OR resources.assignee_id = $2)"
        );
    }
}
