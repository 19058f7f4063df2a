//! Article repository
//!
//! Database operations for articles.
//!
//! This module provides:
//! - `ArticleRepository` trait defining the interface for article data access
//! - `SqlxArticleRepository` implementing the trait for SQLite and MySQL
//!
//! Reads go through [`FindArgs`], which is compiled into a single SELECT by
//! [`compile_find`]. Requested relations are loaded afterwards with one
//! `IN (...)` query per relation.

use crate::config::DatabaseDriver;
use crate::db::filter::{compile_find, FindArgs, Include, ScalarValue};
use crate::db::DynDatabasePool;
use crate::models::{Article, Category, CreateArticleInput, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, MySqlConnection, MySqlPool, Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;

/// Article repository trait
#[async_trait]
pub trait ArticleRepository: Send + Sync {
    /// Find every article matching `args`
    async fn find_many(&self, args: &FindArgs) -> Result<Vec<Article>>;

    /// Count all articles
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based article repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxArticleRepository {
    pool: DynDatabasePool,
}

impl SqlxArticleRepository {
    /// Create a new SQLx article repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn ArticleRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ArticleRepository for SqlxArticleRepository {
    async fn find_many(&self, args: &FindArgs) -> Result<Vec<Article>> {
        if let Some(pool) = self.pool.as_sqlite() {
            return find_articles_sqlite(pool, args).await;
        }
        if let Some(pool) = self.pool.as_mysql() {
            return find_articles_mysql(pool, args).await;
        }
        anyhow::bail!("Unsupported database pool")
    }

    async fn count(&self) -> Result<i64> {
        if let Some(pool) = self.pool.as_sqlite() {
            return count_articles_sqlite(pool).await;
        }
        if let Some(pool) = self.pool.as_mysql() {
            return count_articles_mysql(pool).await;
        }
        anyhow::bail!("Unsupported database pool")
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn created_by_ids(articles: &[Article]) -> Vec<i64> {
    let mut ids: Vec<i64> = articles.iter().map(|a| a.created_by_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn attach_users(articles: &mut [Article], users: HashMap<i64, User>) {
    for article in articles {
        article.created_by = users.get(&article.created_by_id).cloned();
    }
}

fn attach_categories(articles: &mut [Article], mut links: HashMap<i64, Vec<Category>>) {
    for article in articles {
        article.categories = Some(links.remove(&article.id).unwrap_or_default());
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

fn bind_sqlite<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [ScalarValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            ScalarValue::Int(v) => query.bind(*v),
            ScalarValue::Text(v) => query.bind(v.as_str()),
            ScalarValue::Bool(v) => query.bind(*v),
        };
    }
    query
}

/// Insert an article with its category links on `conn`; the caller owns the
/// surrounding transaction
pub(crate) async fn insert_article_sqlite(
    conn: &mut SqliteConnection,
    input: &CreateArticleInput,
) -> Result<Article> {
    let published = input.is_published();

    let result = sqlx::query(
        "INSERT INTO articles (title, body, published, created_by_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.body)
    .bind(published)
    .bind(input.created_by_id)
    .execute(&mut *conn)
    .await
    .context("Failed to create article")?;
    let id = result.last_insert_rowid();

    let mut category_ids = input.category_ids.clone();
    for name in &input.new_categories {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&mut *conn)
            .await
            .context("Failed to create category")?;
        category_ids.push(result.last_insert_rowid());
    }

    for category_id in category_ids {
        sqlx::query("INSERT INTO article_categories (article_id, category_id) VALUES (?, ?)")
            .bind(id)
            .bind(category_id)
            .execute(&mut *conn)
            .await
            .context("Failed to link article category")?;
    }

    Ok(Article {
        id,
        title: input.title.clone(),
        body: input.body.clone(),
        published,
        created_by_id: input.created_by_id,
        created_by: None,
        categories: None,
    })
}

async fn find_articles_sqlite(pool: &SqlitePool, args: &FindArgs) -> Result<Vec<Article>> {
    let fragment = compile_find(DatabaseDriver::Sqlite, args);
    let rows = bind_sqlite(sqlx::query(&fragment.sql), &fragment.params)
        .fetch_all(pool)
        .await
        .context("Failed to find articles")?;

    let mut articles = Vec::with_capacity(rows.len());
    for row in rows {
        articles.push(row_to_article_sqlite(&row)?);
    }

    include_relations_sqlite(pool, &mut articles, args.include).await?;
    Ok(articles)
}

async fn include_relations_sqlite(
    pool: &SqlitePool,
    articles: &mut [Article],
    include: Include,
) -> Result<()> {
    if articles.is_empty() {
        return Ok(());
    }

    if include.created_by {
        let ids = created_by_ids(articles);
        let sql = format!(
            "SELECT id, name, email, password, reset_token, is_admin FROM users WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to load article authors")?;

        let mut users = HashMap::new();
        for row in rows {
            let user = super::user::row_to_user_sqlite(&row)?;
            users.insert(user.id, user);
        }
        attach_users(articles, users);
    }

    if include.categories {
        let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
        let sql = format!(
            r#"
            SELECT ac.article_id, c.id, c.name
            FROM article_categories ac
            JOIN categories c ON c.id = ac.category_id
            WHERE ac.article_id IN ({})
            ORDER BY c.id
            "#,
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to load article categories")?;

        let mut links: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in rows {
            links.entry(row.get("article_id")).or_default().push(Category {
                id: row.get("id"),
                name: row.get("name"),
            });
        }
        attach_categories(articles, links);
    }

    Ok(())
}

async fn count_articles_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles")
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;
    Ok(row.get("count"))
}

fn row_to_article_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        published: row.try_get("published")?,
        created_by_id: row.try_get("created_by_id")?,
        created_by: None,
        categories: None,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

fn bind_mysql<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [ScalarValue],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            ScalarValue::Int(v) => query.bind(*v),
            ScalarValue::Text(v) => query.bind(v.as_str()),
            ScalarValue::Bool(v) => query.bind(*v),
        };
    }
    query
}

/// Insert an article with its category links on `conn`; the caller owns the
/// surrounding transaction
pub(crate) async fn insert_article_mysql(
    conn: &mut MySqlConnection,
    input: &CreateArticleInput,
) -> Result<Article> {
    let published = input.is_published();

    let result = sqlx::query(
        "INSERT INTO articles (title, body, published, created_by_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.body)
    .bind(published)
    .bind(input.created_by_id)
    .execute(&mut *conn)
    .await
    .context("Failed to create article")?;
    let id = result.last_insert_id() as i64;

    let mut category_ids = input.category_ids.clone();
    for name in &input.new_categories {
        let result = sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(&mut *conn)
            .await
            .context("Failed to create category")?;
        category_ids.push(result.last_insert_id() as i64);
    }

    for category_id in category_ids {
        sqlx::query("INSERT INTO article_categories (article_id, category_id) VALUES (?, ?)")
            .bind(id)
            .bind(category_id)
            .execute(&mut *conn)
            .await
            .context("Failed to link article category")?;
    }

    Ok(Article {
        id,
        title: input.title.clone(),
        body: input.body.clone(),
        published,
        created_by_id: input.created_by_id,
        created_by: None,
        categories: None,
    })
}

async fn find_articles_mysql(pool: &MySqlPool, args: &FindArgs) -> Result<Vec<Article>> {
    let fragment = compile_find(DatabaseDriver::Mysql, args);
    let rows = bind_mysql(sqlx::query(&fragment.sql), &fragment.params)
        .fetch_all(pool)
        .await
        .context("Failed to find articles")?;

    let mut articles = Vec::with_capacity(rows.len());
    for row in rows {
        articles.push(row_to_article_mysql(&row)?);
    }

    include_relations_mysql(pool, &mut articles, args.include).await?;
    Ok(articles)
}

async fn include_relations_mysql(
    pool: &MySqlPool,
    articles: &mut [Article],
    include: Include,
) -> Result<()> {
    if articles.is_empty() {
        return Ok(());
    }

    if include.created_by {
        let ids = created_by_ids(articles);
        let sql = format!(
            "SELECT id, name, email, password, reset_token, is_admin FROM users WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to load article authors")?;

        let mut users = HashMap::new();
        for row in rows {
            let user = super::user::row_to_user_mysql(&row)?;
            users.insert(user.id, user);
        }
        attach_users(articles, users);
    }

    if include.categories {
        let ids: Vec<i64> = articles.iter().map(|a| a.id).collect();
        let sql = format!(
            r#"
            SELECT ac.article_id, c.id, c.name
            FROM article_categories ac
            JOIN categories c ON c.id = ac.category_id
            WHERE ac.article_id IN ({})
            ORDER BY c.id
            "#,
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in &ids {
            query = query.bind(*id);
        }
        let rows = query
            .fetch_all(pool)
            .await
            .context("Failed to load article categories")?;

        let mut links: HashMap<i64, Vec<Category>> = HashMap::new();
        for row in rows {
            links.entry(row.get("article_id")).or_default().push(Category {
                id: row.get("id"),
                name: row.get("name"),
            });
        }
        attach_categories(articles, links);
    }

    Ok(())
}

async fn count_articles_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM articles")
        .fetch_one(pool)
        .await
        .context("Failed to count articles")?;
    Ok(row.get("count"))
}

fn row_to_article_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Article> {
    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        body: row.try_get("body")?,
        published: row.try_get("published")?,
        created_by_id: row.try_get("created_by_id")?,
        created_by: None,
        categories: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::filter::{Parser, Predicate};
    use crate::db::repositories::user::insert_user_sqlite;
    use crate::db::{create_test_pool, migrations};
    use crate::models::CreateUserInput;
    use serde_json::json;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxArticleRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let mut conn = pool.as_sqlite().unwrap().acquire().await.unwrap();
        let author = insert_user_sqlite(
            &mut conn,
            &CreateUserInput {
                name: "writer".to_string(),
                email: "writer@example.com".to_string(),
                password: "pw".to_string(),
                reset_token: "0011223344556677".to_string(),
                is_admin: false,
            },
        )
        .await
        .expect("Failed to create author");
        drop(conn);

        let repo = SqlxArticleRepository::new(pool.clone());
        (pool, repo, author.id)
    }

    async fn create(pool: &DynDatabasePool, input: CreateArticleInput) -> Result<Article> {
        let mut conn = pool.as_sqlite().unwrap().acquire().await.unwrap();
        insert_article_sqlite(&mut conn, &input).await
    }

    fn find(value: serde_json::Value) -> FindArgs {
        Parser::strict().parse_find_args(&value).unwrap()
    }

    #[tokio::test]
    async fn test_create_article() {
        let (pool, repo, author) = setup_test_repo().await;

        let created = create(&pool, CreateArticleInput::new("Draft", "Body", author))
            .await
            .expect("Failed to create article");

        assert!(created.id > 0);
        assert!(!created.published);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_author() {
        let (pool, repo, _author) = setup_test_repo().await;
        let result = create(&pool, CreateArticleInput::new("Orphan", "Body", 999)).await;
        assert!(result.is_err());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_many_filters_and_orders() {
        let (pool, repo, author) = setup_test_repo().await;
        for (title, published) in [("b", true), ("a", true), ("c", false)] {
            create(&pool, CreateArticleInput::new(title, "x", author).with_published(published))
                .await
                .unwrap();
        }

        let all = repo.find_many(&FindArgs::default()).await.unwrap();
        assert_eq!(all.iter().map(|a| a.id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let published = repo
            .find_many(&FindArgs::with_filter(Predicate::published(true)))
            .await
            .unwrap();
        assert_eq!(published.len(), 2);
        assert!(published.iter().all(|a| a.published));

        let sorted = repo
            .find_many(&find(json!({"orderBy": {"title": "asc"}, "take": 2})))
            .await
            .unwrap();
        let titles: Vec<_> = sorted.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);

        let skipped = repo.find_many(&find(json!({"skip": 2}))).await.unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].title, "c");
    }

    #[tokio::test]
    async fn test_relation_filters() {
        let (pool, repo, author) = setup_test_repo().await;
        create(&pool, CreateArticleInput::new("tagged", "x", author).with_new_category("blog"))
            .await
            .unwrap();
        create(&pool, CreateArticleInput::new("bare", "x", author))
            .await
            .unwrap();

        let some = repo
            .find_many(&find(json!({"where": {"categories": {"some": {"name": "blog"}}}})))
            .await
            .unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].title, "tagged");

        // Vacuously true for the article without categories.
        let every = repo
            .find_many(&find(json!({"where": {"categories": {"every": {"name": "news"}}}})))
            .await
            .unwrap();
        assert_eq!(every.len(), 1);
        assert_eq!(every[0].title, "bare");

        let by_author_secret = repo
            .find_many(&find(json!({"where": {"createdBy": {"resetToken": {"startsWith": "0011"}}}})))
            .await
            .unwrap();
        assert_eq!(by_author_secret.len(), 2);
    }

    #[tokio::test]
    async fn test_include_relations() {
        let (pool, repo, author) = setup_test_repo().await;
        create(
            &pool,
            CreateArticleInput::new("with", "x", author)
                .with_new_category("one")
                .with_new_category("two"),
        )
        .await
        .unwrap();
        create(&pool, CreateArticleInput::new("without", "x", author))
            .await
            .unwrap();

        let plain = repo.find_many(&FindArgs::default()).await.unwrap();
        assert!(plain.iter().all(|a| a.created_by.is_none() && a.categories.is_none()));

        let loaded = repo
            .find_many(&find(json!({"include": {"createdBy": true, "categories": true}})))
            .await
            .unwrap();
        assert_eq!(loaded[0].created_by.as_ref().map(|u| u.name.as_str()), Some("writer"));
        let names: Vec<_> = loaded[0]
            .categories
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(names, vec!["one", "two"]);
        assert_eq!(loaded[1].categories, Some(vec![]));
    }

    #[tokio::test]
    async fn test_find_many_on_empty_table() {
        let (_pool, repo, _author) = setup_test_repo().await;
        let found = repo
            .find_many(&find(json!({"include": {"createdBy": true}})))
            .await
            .unwrap();
        assert!(found.is_empty());
    }
}
