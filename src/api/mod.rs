//! API layer - HTTP handlers and routing
//!
//! This module contains the HTTP surface of the article API:
//! - Article query endpoints
//! - Query-string decoding for the GET endpoint
//! - Shared application state

pub mod articles;
pub mod middleware;
pub mod query_string;

use axum::{body::Body, extract::DefaultBodyLimit, http::Request, Router};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;

pub use middleware::AppState;

/// Build the complete router with middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(articles::router())
        // Filters of any size reach the handlers, which answer 200 either way.
        .layer(DefaultBodyLimit::disable())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedConfig;
    use crate::db::seed::{run_seed, SECRET_ARTICLE_TITLE};
    use crate::db::{create_test_pool, migrations};
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn setup_router() -> Router {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        run_seed(&pool, &SeedConfig::default())
            .await
            .expect("Failed to seed");
        build_router(AppState::new(pool))
    }

    async fn send(router: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn titles(value: &Value) -> Vec<String> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["title"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_get_without_filter_returns_everything() {
        let router = setup_router().await;
        let (status, body) = send(&router, Method::GET, "/articles", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 101);
    }

    #[tokio::test]
    async fn test_get_filter_from_query_string() {
        let router = setup_router().await;
        let (status, body) = send(
            &router,
            Method::GET,
            "/articles?filter[published]=false",
            "",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(titles(&body), vec![SECRET_ARTICLE_TITLE]);

        let (_, body) = send(
            &router,
            Method::GET,
            "/articles?filter[createdBy][password][startsWith]=mah",
            "",
        )
        .await;
        assert_eq!(titles(&body), vec![SECRET_ARTICLE_TITLE]);
    }

    #[tokio::test]
    async fn test_verybad_passes_directives_through() {
        let router = setup_router().await;

        let (_, body) = send(&router, Method::POST, "/articles/verybad", "{}").await;
        assert_eq!(body.as_array().unwrap().len(), 101);

        let (_, body) = send(
            &router,
            Method::POST,
            "/articles/verybad",
            r#"{"filter":{"where":{"published":false},"include":{"createdBy":true}}}"#,
        )
        .await;
        let articles = body.as_array().unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0]["createdBy"]["name"], "jeff-the-manager");
        assert_eq!(articles[0]["createdBy"]["password"], "mah name is jeff1");
    }

    #[tokio::test]
    async fn test_overlay_route_only_returns_published() {
        let router = setup_router().await;

        let (_, body) = send(&router, Method::POST, "/articles", r#"{"query":{}}"#).await;
        let articles = body.as_array().unwrap();
        assert_eq!(articles.len(), 100);
        assert!(articles.iter().all(|a| a["published"] == true));

        let (_, body) = send(
            &router,
            Method::POST,
            "/articles",
            r#"{"query":{"OR":[{"published":false},{"title":"Important Post"}]}}"#,
        )
        .await;
        assert_eq!(body, json!([]));

        let (_, body) = send(
            &router,
            Method::POST,
            "/articles",
            r#"{"query":{"createdBy":{"name":"karen"}},"extra":1}"#,
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_time_based_route_is_always_empty() {
        let router = setup_router().await;
        for body in [
            r#"{"query":{}}"#,
            r#"{"query":{"createdBy":{"resetToken":{"startsWith":"a"}}}}"#,
            r#"{"query":{"bogus":1}}"#,
            "",
        ] {
            let (status, value) = send(&router, Method::POST, "/articles/time-based", body).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(value, json!([]));
        }
    }

    #[tokio::test]
    async fn test_failures_are_200_and_empty() {
        let router = setup_router().await;
        let cases = [
            (Method::GET, "/articles?filter[nope]=1", ""),
            (Method::GET, "/articles?filter=plain", ""),
            (Method::POST, "/articles", "not json"),
            (Method::POST, "/articles", ""),
            (Method::POST, "/articles", r#"{"query":{"title":{"regex":"x"}}}"#),
            (Method::POST, "/articles/verybad", r#"{"filter":{"select":{"id":true}}}"#),
            (Method::POST, "/articles/verybad", "{"),
        ];

        for (method, uri, body) in cases {
            let (status, value) = send(&router, method, uri, body).await;
            assert_eq!(status, StatusCode::OK, "{} {}", uri, body);
            assert_eq!(value, json!([]), "{} {}", uri, body);
        }
    }

    #[tokio::test]
    async fn test_large_bodies_reach_the_handler() {
        let router = setup_router().await;
        let padding = "a".repeat(3 * 1024 * 1024);

        let body = json!({"filter": {"where": {"title": {"contains": padding}}}}).to_string();
        let (status, value) = send(&router, Method::POST, "/articles/verybad", &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value, json!([]));

        let body = json!({"query": {"body": {"not": padding}}}).to_string();
        let (status, value) = send(&router, Method::POST, "/articles", &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value.as_array().unwrap().len(), 100);
    }

    #[tokio::test]
    async fn test_caller_published_key_is_replaced() {
        let router = setup_router().await;
        let (status, body) = send(
            &router,
            Method::POST,
            "/articles",
            r#"{"query":{"published":false}}"#,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let articles = body.as_array().unwrap();
        assert_eq!(articles.len(), 100);
        assert!(articles.iter().all(|a| a["published"] == true));
        assert!(!titles(&body).contains(&SECRET_ARTICLE_TITLE.to_string()));
    }

    #[tokio::test]
    async fn test_identical_requests_give_identical_bodies() {
        let router = setup_router().await;
        let body = r#"{"filter":{"where":{"title":{"contains":"1"}},"orderBy":{"title":"asc"}}}"#;
        let (_, first) = send(&router, Method::POST, "/articles/verybad", body).await;
        let (_, second) = send(&router, Method::POST, "/articles/verybad", body).await;
        assert_eq!(first, second);
    }
}
