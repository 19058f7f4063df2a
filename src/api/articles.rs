//! Article API endpoints
//!
//! - GET /articles - `filter` query parameter as the where object
//! - POST /articles/verybad - body `filter` as the full argument object
//! - POST /articles - body `query`, published articles only
//! - POST /articles/time-based - body `query`, always answers `[]`
//!
//! Every route answers 200 with a JSON array. Filter, decoding and storage
//! failures all produce `[]`.

use axum::{
    body::Bytes,
    extract::{RawQuery, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;

use crate::api::middleware::AppState;
use crate::api::query_string;
use crate::models::{Article, Category, User};
use crate::services::FilterPolicy;

/// Article as returned by the API
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub published: bool,
    pub created_by_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<CategoryResponse>>,
}

/// Author loaded through `include.createdBy`; every column is returned
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password: String,
    pub reset_token: String,
    pub is_admin: bool,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            password: user.password,
            reset_token: user.reset_token,
            is_admin: user.is_admin,
        }
    }
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
        }
    }
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            id: article.id,
            title: article.title,
            body: article.body,
            published: article.published,
            created_by_id: article.created_by_id,
            created_by: article.created_by.map(UserResponse::from),
            categories: article
                .categories
                .map(|list| list.into_iter().map(CategoryResponse::from).collect()),
        }
    }
}

/// Build the article router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/articles", get(find_by_query_param))
        .route("/articles", post(find_published))
        .route("/articles/verybad", post(find_by_body))
        .route("/articles/time-based", post(find_published_no_result))
}

/// Pull `field` out of a JSON request body
///
/// An empty body reads as `{}`. Bodies that are not JSON are an error, which
/// the handlers answer with `[]`.
fn body_field(body: &Bytes, field: &str) -> Result<Option<Value>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: Value = serde_json::from_slice(body)?;
    Ok(value.get(field).cloned())
}

async fn respond(state: &AppState, policy: FilterPolicy, input: Option<Value>) -> Json<Vec<ArticleResponse>> {
    let articles = state.article_service.find(policy, input).await;
    Json(articles.into_iter().map(ArticleResponse::from).collect())
}

async fn respond_to_body(
    state: &AppState,
    policy: FilterPolicy,
    body: &Bytes,
    field: &str,
) -> Json<Vec<ArticleResponse>> {
    match body_field(body, field) {
        Ok(input) => respond(state, policy, input).await,
        Err(e) => {
            tracing::debug!(policy = policy.name(), error = %e, "Request body is not JSON");
            Json(Vec::new())
        }
    }
}

/// GET /articles
pub async fn find_by_query_param(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Json<Vec<ArticleResponse>> {
    let params = query_string::parse(query.as_deref().unwrap_or(""));
    let input = params.get("filter").cloned();
    respond(&state, FilterPolicy::PassthroughQueryParam, input).await
}

/// POST /articles/verybad
pub async fn find_by_body(State(state): State<AppState>, body: Bytes) -> Json<Vec<ArticleResponse>> {
    respond_to_body(&state, FilterPolicy::PassthroughBody, &body, "filter").await
}

/// POST /articles
pub async fn find_published(State(state): State<AppState>, body: Bytes) -> Json<Vec<ArticleResponse>> {
    respond_to_body(&state, FilterPolicy::OverlayPublished, &body, "query").await
}

/// POST /articles/time-based
pub async fn find_published_no_result(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<Vec<ArticleResponse>> {
    respond_to_body(&state, FilterPolicy::OverlayPublishedNoResult, &body, "query").await
}
