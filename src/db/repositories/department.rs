//! Department repository
//!
//! Departments only exist to be joined against users. Rows are written by the
//! fixture loader through the connection-level inserts below; the repository
//! itself only counts.

use crate::db::DynDatabasePool;
use crate::models::Department;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlConnection, Row, SqliteConnection};

/// Department repository trait
#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// Count all departments
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based department repository implementation
pub struct SqlxDepartmentRepository {
    pool: DynDatabasePool,
}

impl SqlxDepartmentRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

const INSERT_DEPARTMENT: &str = "INSERT INTO departments (name) VALUES (?)";
const INSERT_MEMBER: &str = "INSERT INTO user_departments (user_id, department_id) VALUES (?, ?)";
const COUNT_DEPARTMENTS: &str = "SELECT COUNT(*) as count FROM departments";

#[async_trait]
impl DepartmentRepository for SqlxDepartmentRepository {
    async fn count(&self) -> Result<i64> {
        if let Some(pool) = self.pool.as_sqlite() {
            let row = sqlx::query(COUNT_DEPARTMENTS)
                .fetch_one(pool)
                .await
                .context("Failed to count departments")?;
            return Ok(row.get("count"));
        }
        if let Some(pool) = self.pool.as_mysql() {
            let row = sqlx::query(COUNT_DEPARTMENTS)
                .fetch_one(pool)
                .await
                .context("Failed to count departments")?;
            return Ok(row.get("count"));
        }
        anyhow::bail!("Unsupported database pool")
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

pub(crate) async fn insert_department_sqlite(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Department> {
    let id = sqlx::query(INSERT_DEPARTMENT)
        .bind(name)
        .execute(&mut *conn)
        .await
        .context("Failed to create department")?
        .last_insert_rowid();

    Ok(Department {
        id,
        name: name.to_string(),
    })
}

pub(crate) async fn insert_member_sqlite(
    conn: &mut SqliteConnection,
    department_id: i64,
    user_id: i64,
) -> Result<()> {
    sqlx::query(INSERT_MEMBER)
        .bind(user_id)
        .bind(department_id)
        .execute(&mut *conn)
        .await
        .context("Failed to add department member")?;
    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

pub(crate) async fn insert_department_mysql(
    conn: &mut MySqlConnection,
    name: &str,
) -> Result<Department> {
    let id = sqlx::query(INSERT_DEPARTMENT)
        .bind(name)
        .execute(&mut *conn)
        .await
        .context("Failed to create department")?
        .last_insert_id() as i64;

    Ok(Department {
        id,
        name: name.to_string(),
    })
}

pub(crate) async fn insert_member_mysql(
    conn: &mut MySqlConnection,
    department_id: i64,
    user_id: i64,
) -> Result<()> {
    sqlx::query(INSERT_MEMBER)
        .bind(user_id)
        .bind(department_id)
        .execute(&mut *conn)
        .await
        .context("Failed to add department member")?;
    Ok(())
}
