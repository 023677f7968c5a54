//! # ResourceX Shared Library
//!
//! This crate contains the models, query engine, and access scoping logic
//! shared by the ResourceX API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and their CRUD / aggregation operations
//! - `query`: Filter, sort, and pagination primitives
//! - `scope`: Access scoping policy (visibility predicates)
//! - `auth`: Authentication utilities (JWT, password hashing, middleware)
//! - `db`: Connection pool and migration runner

pub mod auth;
pub mod db;
pub mod models;
pub mod query;
pub mod scope;

/// Current version of the ResourceX shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
