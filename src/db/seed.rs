//! Fixture data loader
//!
//! Populates an empty store with the fixed departments and users plus a
//! batch of generated articles. Runs once at startup inside a single
//! transaction, so a failed run leaves the store empty and the next start
//! seeds again; a store that already has users is left untouched.

use anyhow::{Context, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sqlx::{MySqlConnection, SqliteConnection};

use crate::config::SeedConfig;
use crate::db::repositories::article::{insert_article_mysql, insert_article_sqlite};
use crate::db::repositories::department::{
    insert_department_mysql, insert_department_sqlite, insert_member_mysql, insert_member_sqlite,
};
use crate::db::repositories::user::{insert_user_mysql, insert_user_sqlite};
use crate::db::repositories::{
    ArticleRepository, CategoryRepository, DepartmentRepository, SqlxArticleRepository,
    SqlxCategoryRepository, SqlxDepartmentRepository, SqlxUserRepository, UserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::{CreateArticleInput, CreateUserInput};

pub const SECRET_ARTICLE_TITLE: &str = "Important Post";
pub const SECRET_ARTICLE_BODY: &str =
    "Don't publish yet, it is secret and I haven't finished it yet... Hello world";
const GENERATED_CATEGORY: &str = "blog";

const DEPARTMENTS: [&str; 3] = ["Sales", "Managers", "Admins"];
const SALES: usize = 0;
const MANAGERS: usize = 1;
const ADMINS: usize = 2;

struct FixtureUser {
    name: &'static str,
    password: &'static str,
    is_admin: bool,
    /// Indices into `DEPARTMENTS`
    departments: &'static [usize],
}

const USERS: [FixtureUser; 4] = [
    FixtureUser {
        name: "karen",
        password: "super secret passphrase",
        is_admin: false,
        departments: &[SALES],
    },
    FixtureUser {
        name: "jeff-the-manager",
        password: "mah name is jeff1",
        is_admin: false,
        departments: &[SALES, MANAGERS],
    },
    FixtureUser {
        name: "mike-the-admin",
        password: "kentocky froid chocken",
        is_admin: true,
        departments: &[MANAGERS, ADMINS],
    },
    FixtureUser {
        name: "root",
        password: "password1 should be good enough",
        is_admin: true,
        departments: &[ADMINS],
    },
];
/// Author of the generated articles
const KAREN: usize = 0;
/// Author of the unpublished article
const JEFF: usize = 1;

/// Totals after a seed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    /// The store already had users, so nothing was written
    pub skipped: bool,
    pub users: i64,
    pub departments: i64,
    pub articles: i64,
    pub categories: i64,
}

/// Lowercase hex of `bytes` random bytes
fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{:02x}", b)).collect()
}

impl FixtureUser {
    fn input(&self) -> CreateUserInput {
        CreateUserInput {
            name: self.name.to_string(),
            email: format!("{}@example.com", self.name),
            password: self.password.to_string(),
            reset_token: random_hex(8),
            is_admin: self.is_admin,
        }
    }
}

/// Articles to insert once the users exist; `user_ids` follows `USERS`
fn article_inputs(config: &SeedConfig, user_ids: &[i64]) -> Vec<CreateArticleInput> {
    let mut inputs: Vec<CreateArticleInput> = (0..config.article_count)
        .map(|_| {
            CreateArticleInput::new(random_hex(4), random_hex(128), user_ids[KAREN])
                .with_published(true)
                .with_new_category(GENERATED_CATEGORY)
        })
        .collect();

    let secret =
        CreateArticleInput::new(SECRET_ARTICLE_TITLE, SECRET_ARTICLE_BODY, user_ids[JEFF]);
    inputs.push(if config.article_count > 0 {
        secret.with_category(1)
    } else {
        secret.with_new_category(GENERATED_CATEGORY)
    });
    inputs
}

/// Populate the store unless it already holds users
pub async fn run_seed(pool: &DynDatabasePool, config: &SeedConfig) -> Result<SeedReport> {
    let users = SqlxUserRepository::new(pool.clone());
    let departments = SqlxDepartmentRepository::new(pool.clone());
    let articles = SqlxArticleRepository::new(pool.clone());
    let categories = SqlxCategoryRepository::new(pool.clone());

    if users.count().await? > 0 {
        tracing::info!("Store already populated, skipping seed");
        return Ok(SeedReport {
            skipped: true,
            ..SeedReport::default()
        });
    }

    if let Some(pool) = pool.as_sqlite() {
        let mut tx = pool.begin().await.context("Failed to begin seed transaction")?;
        seed_sqlite(&mut tx, config).await?;
        tx.commit().await.context("Failed to commit seed")?;
    } else if let Some(pool) = pool.as_mysql() {
        let mut tx = pool.begin().await.context("Failed to begin seed transaction")?;
        seed_mysql(&mut tx, config).await?;
        tx.commit().await.context("Failed to commit seed")?;
    } else {
        anyhow::bail!("Unsupported database pool")
    }

    let report = SeedReport {
        skipped: false,
        users: users.count().await?,
        departments: departments.count().await?,
        articles: articles.count().await?,
        categories: categories.count().await?,
    };
    tracing::info!(
        users = report.users,
        articles = report.articles,
        "Seeded {} users and {} articles",
        report.users,
        report.articles
    );

    Ok(report)
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn seed_sqlite(conn: &mut SqliteConnection, config: &SeedConfig) -> Result<()> {
    let mut department_ids = Vec::with_capacity(DEPARTMENTS.len());
    for name in DEPARTMENTS {
        department_ids.push(insert_department_sqlite(conn, name).await?.id);
    }

    let mut user_ids = Vec::with_capacity(USERS.len());
    for fixture in &USERS {
        let user = insert_user_sqlite(conn, &fixture.input())
            .await
            .with_context(|| format!("Failed to seed user {}", fixture.name))?;
        for &index in fixture.departments {
            insert_member_sqlite(conn, department_ids[index], user.id).await?;
        }
        tracing::debug!(?user, "Seeded user");
        user_ids.push(user.id);
    }

    for input in article_inputs(config, &user_ids) {
        let article = insert_article_sqlite(conn, &input)
            .await
            .with_context(|| format!("Failed to seed article {}", input.title))?;
        tracing::debug!(?article, "Seeded article");
    }

    Ok(())
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn seed_mysql(conn: &mut MySqlConnection, config: &SeedConfig) -> Result<()> {
    let mut department_ids = Vec::with_capacity(DEPARTMENTS.len());
    for name in DEPARTMENTS {
        department_ids.push(insert_department_mysql(conn, name).await?.id);
    }

    let mut user_ids = Vec::with_capacity(USERS.len());
    for fixture in &USERS {
        let user = insert_user_mysql(conn, &fixture.input())
            .await
            .with_context(|| format!("Failed to seed user {}", fixture.name))?;
        for &index in fixture.departments {
            insert_member_mysql(conn, department_ids[index], user.id).await?;
        }
        tracing::debug!(?user, "Seeded user");
        user_ids.push(user.id);
    }

    for input in article_inputs(config, &user_ids) {
        let article = insert_article_mysql(conn, &input)
            .await
            .with_context(|| format!("Failed to seed article {}", input.title))?;
        tracing::debug!(?article, "Seeded article");
    }

    Ok(())
}
