//! Database access utilities
//!
//! - `pool`: PostgreSQL connection pool creation
//! - `migrations`: sqlx migration runner

pub mod migrations;
pub mod pool;

pub use migrations::run_migrations;
pub use pool::{create_pool, DatabaseConfig};
