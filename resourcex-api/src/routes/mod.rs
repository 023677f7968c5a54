/// API route handlers
pub mod auth;
pub mod dashboard;
pub mod health;
pub mod resources;
pub mod users;
