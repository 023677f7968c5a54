/// Database models for ResourceX
///
/// This module contains all database models and their CRUD and aggregation
/// operations.
///
/// # Models
///
/// - `user`: User accounts, listing, and user statistics
/// - `role`: Static role reference data (many-to-many with users)
/// - `resource`: Resources with filtering, pagination, and dashboard stats
///
/// # Example
///
/// ```no_run
/// use resourcex_shared::models::user::{User, CreateUser};
/// use resourcex_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     name: "Jane Doe".to_string(),
///     email: "jane@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
/// # Ok(())
/// # }
/// ```
pub mod resource;
pub mod role;
pub mod user;
