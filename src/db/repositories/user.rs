//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL
//! - connection-level inserts used by the fixture loader's transaction

use crate::db::DynDatabasePool;
use crate::models::{CreateUserInput, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlConnection, Row, SqliteConnection};

/// User repository trait
///
/// Users are only written by the fixture loader, which inserts them inside its
/// own transaction through [`insert_user_sqlite`] and [`insert_user_mysql`].
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Count all users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

const INSERT_USER: &str =
    "INSERT INTO users (name, email, password, reset_token, is_admin) VALUES (?, ?, ?, ?, ?)";
const COUNT_USERS: &str = "SELECT COUNT(*) as count FROM users";

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn count(&self) -> Result<i64> {
        if let Some(pool) = self.pool.as_sqlite() {
            let row = sqlx::query(COUNT_USERS)
                .fetch_one(pool)
                .await
                .context("Failed to count users")?;
            return Ok(row.get("count"));
        }
        if let Some(pool) = self.pool.as_mysql() {
            let row = sqlx::query(COUNT_USERS)
                .fetch_one(pool)
                .await
                .context("Failed to count users")?;
            return Ok(row.get("count"));
        }
        anyhow::bail!("Unsupported database pool")
    }
}

fn user_from_input(id: i64, input: &CreateUserInput) -> User {
    User {
        id,
        name: input.name.clone(),
        email: input.email.clone(),
        password: input.password.clone(),
        reset_token: input.reset_token.clone(),
        is_admin: input.is_admin,
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

pub(crate) async fn insert_user_sqlite(
    conn: &mut SqliteConnection,
    input: &CreateUserInput,
) -> Result<User> {
    let result = sqlx::query(INSERT_USER)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.password)
        .bind(&input.reset_token)
        .bind(input.is_admin)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to create user {}", input.email))?;

    Ok(user_from_input(result.last_insert_rowid(), input))
}

pub(crate) fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password: row.try_get("password")?,
        reset_token: row.try_get("reset_token")?,
        is_admin: row.try_get("is_admin")?,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

pub(crate) async fn insert_user_mysql(
    conn: &mut MySqlConnection,
    input: &CreateUserInput,
) -> Result<User> {
    let result = sqlx::query(INSERT_USER)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.password)
        .bind(&input.reset_token)
        .bind(input.is_admin)
        .execute(&mut *conn)
        .await
        .with_context(|| format!("Failed to create user {}", input.email))?;

    Ok(user_from_input(result.last_insert_id() as i64, input))
}

pub(crate) fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password: row.try_get("password")?,
        reset_token: row.try_get("reset_token")?,
        is_admin: row.try_get("is_admin")?,
    })
}
