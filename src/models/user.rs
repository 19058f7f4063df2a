//! User model
//!
//! Users are created once by the seed loader and only ever read afterwards.
//! The credential is stored as given; nothing in the request path hashes,
//! redacts, or checks it.

use serde::{Deserialize, Serialize};

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Display name
    pub name: String,
    /// Email address (unique)
    pub email: String,
    /// Plaintext credential
    pub password: String,
    /// Password reset token
    pub reset_token: String,
    /// Administrator flag (stored only, never enforced)
    pub is_admin: bool,
}

/// Input for creating a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub reset_token: String,
    pub is_admin: bool,
}
