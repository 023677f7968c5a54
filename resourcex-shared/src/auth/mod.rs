//! Authentication utilities
//!
//! - `jwt`: Access/refresh token creation and validation
//! - `password`: Argon2id password hashing and verification
//! - `middleware`: Request authentication and the caller identity context

pub mod jwt;
pub mod middleware;
pub mod password;
