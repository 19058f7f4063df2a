//! Article query service
//!
//! Runs a route's [`FilterPolicy`] against the article repository and
//! adapts the outcome. Every failure is suppressed into an empty list; only
//! the overlay route reports it to the log first. The no-result policy always
//! runs its query to completion before answering with an empty list.

use serde_json::Value;
use std::sync::Arc;

use crate::db::filter::FilterError;
use crate::db::repositories::ArticleRepository;
use crate::models::Article;
use crate::services::FilterPolicy;

/// Error types for article query operations
#[derive(Debug, thiserror::Error)]
pub enum ArticleQueryError {
    /// The caller filter could not be parsed
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    /// The store rejected or failed the query
    #[error("Query failed: {0}")]
    QueryFailed(#[from] anyhow::Error),
}

/// Article query service
pub struct ArticleQueryService {
    repo: Arc<dyn ArticleRepository>,
}

impl ArticleQueryService {
    /// Create a new article query service
    pub fn new(repo: Arc<dyn ArticleRepository>) -> Self {
        Self { repo }
    }

    /// Run `policy` over `input` and return the articles to respond with
    pub async fn find(&self, policy: FilterPolicy, input: Option<Value>) -> Vec<Article> {
        let outcome = self.try_find(policy, input).await;

        if policy.discards_result() {
            return Vec::new();
        }

        match outcome {
            Ok(articles) => articles,
            Err(e) => {
                if policy.logs_failures() {
                    tracing::warn!(policy = policy.name(), error = %e, "Article query failed");
                }
                Vec::new()
            }
        }
    }

    /// Run `policy` over `input`, keeping failures
    pub async fn try_find(
        &self,
        policy: FilterPolicy,
        input: Option<Value>,
    ) -> Result<Vec<Article>, ArticleQueryError> {
        let args = policy.build(input)?;
        let articles = self.repo.find_many(&args).await?;
        tracing::debug!(policy = policy.name(), count = articles.len(), "Article query");
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SeedConfig;
    use crate::db::filter::FindArgs;
    use crate::db::repositories::SqlxArticleRepository;
    use crate::db::seed::{run_seed, SECRET_ARTICLE_TITLE};
    use crate::db::{create_test_pool, migrations};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    async fn setup_seeded_service(article_count: u32) -> ArticleQueryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        run_seed(
            &pool,
            &SeedConfig {
                enabled: true,
                article_count,
            },
        )
        .await
        .expect("Failed to seed");

        ArticleQueryService::new(SqlxArticleRepository::boxed(pool))
    }

    /// Repository that records calls and takes a fixed time to answer
    struct SlowRepository {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl ArticleRepository for SlowRepository {
        async fn find_many(&self, _args: &FindArgs) -> anyhow::Result<Vec<Article>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail {
                anyhow::bail!("store unavailable");
            }
            Ok(vec![Article {
                id: 1,
                title: "t".to_string(),
                body: "b".to_string(),
                published: true,
                created_by_id: 1,
                created_by: None,
                categories: None,
            }])
        }

        async fn count(&self) -> anyhow::Result<i64> {
            Ok(1)
        }
    }

    fn slow_repository(delay: Duration, fail: bool) -> Arc<SlowRepository> {
        Arc::new(SlowRepository {
            calls: AtomicUsize::new(0),
            delay,
            fail,
        })
    }

    #[tokio::test]
    async fn test_passthrough_body_returns_everything() {
        let service = setup_seeded_service(100).await;

        let all = service.find(FilterPolicy::PassthroughBody, Some(json!({}))).await;
        assert_eq!(all.len(), 101);

        let hidden = service
            .find(
                FilterPolicy::PassthroughBody,
                Some(json!({"where": {"published": false}})),
            )
            .await;
        assert_eq!(hidden.len(), 1);
        assert_eq!(hidden[0].title, SECRET_ARTICLE_TITLE);
    }

    #[tokio::test]
    async fn test_query_param_reaches_related_records() {
        let service = setup_seeded_service(3).await;

        let by_manager = service
            .find(
                FilterPolicy::PassthroughQueryParam,
                Some(json!({"createdBy": {"name": {"startsWith": "jeff"}}})),
            )
            .await;
        assert_eq!(by_manager.len(), 1);
        assert!(!by_manager[0].published);
    }

    #[tokio::test]
    async fn test_overlay_hides_unpublished() {
        let service = setup_seeded_service(3).await;

        let visible = service
            .find(FilterPolicy::OverlayPublished, Some(json!({})))
            .await;
        assert_eq!(visible.len(), 3);
        assert!(visible.iter().all(|a| a.published));

        let overridden = service
            .find(FilterPolicy::OverlayPublished, Some(json!({"published": false})))
            .await;
        assert_eq!(overridden.len(), 3);
        assert!(overridden.iter().all(|a| a.published));

        let sideways = service
            .find(
                FilterPolicy::OverlayPublished,
                Some(json!({"OR": [{"published": false}, {"title": SECRET_ARTICLE_TITLE}]})),
            )
            .await;
        assert!(sideways.is_empty());
    }

    #[tokio::test]
    async fn test_overlay_still_filters_on_author() {
        let service = setup_seeded_service(3).await;

        let karen = service
            .find(
                FilterPolicy::OverlayPublished,
                Some(json!({"createdBy": {"password": {"startsWith": "super"}}})),
            )
            .await;
        assert_eq!(karen.len(), 3);

        let nobody = service
            .find(
                FilterPolicy::OverlayPublished,
                Some(json!({"createdBy": {"password": {"startsWith": "wrong"}}})),
            )
            .await;
        assert!(nobody.is_empty());
    }

    #[tokio::test]
    async fn test_failures_become_empty() {
        let service = setup_seeded_service(3).await;

        for policy in FilterPolicy::ALL {
            let articles = service
                .find(policy, Some(json!({"nonexistent": {"deeply": true}})))
                .await;
            assert!(articles.is_empty(), "{:?} should swallow the failure", policy);
        }

        assert!(service.find(FilterPolicy::OverlayPublished, None).await.is_empty());
        assert!(matches!(
            service.try_find(FilterPolicy::OverlayPublished, None).await,
            Err(ArticleQueryError::InvalidFilter(FilterError::MissingFilter))
        ));
    }

    #[tokio::test]
    async fn test_storage_failure_is_suppressed() {
        let repo = slow_repository(Duration::ZERO, true);
        let service = ArticleQueryService::new(repo.clone());

        assert!(service
            .find(FilterPolicy::PassthroughBody, Some(json!({})))
            .await
            .is_empty());
        assert!(matches!(
            service.try_find(FilterPolicy::PassthroughBody, None).await,
            Err(ArticleQueryError::QueryFailed(_))
        ));
        assert_eq!(repo.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_result_policy_waits_for_query() {
        let delay = Duration::from_millis(50);
        let repo = slow_repository(delay, false);
        let service = ArticleQueryService::new(repo.clone());

        let started = Instant::now();
        let articles = service
            .find(FilterPolicy::OverlayPublishedNoResult, Some(json!({"id": 1})))
            .await;

        assert!(articles.is_empty());
        assert!(started.elapsed() >= delay);
        assert_eq!(repo.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_queries_are_identical() {
        let service = setup_seeded_service(5).await;
        let input = json!({"where": {"title": {"contains": "a"}}, "orderBy": {"title": "desc"}});

        let first = service.find(FilterPolicy::PassthroughBody, Some(input.clone())).await;
        let second = service.find(FilterPolicy::PassthroughBody, Some(input)).await;
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    fn caller_filter() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(json!({})),
            Just(json!({"published": false})),
            Just(json!({"NOT": {"published": true}})),
            Just(json!({"OR": [{"published": false}, {"id": {"gte": 1}}]})),
            "[a-z]{0,3}".prop_map(|s| json!({"createdBy": {"name": {"contains": s}}})),
            (0i64..10).prop_map(|n| json!({"id": {"notIn": [n]}})),
            "[a-z]{0,3}".prop_map(|s| json!({"categories": {"none": {"name": s}}})),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// No caller filter gets an unpublished article through the overlay.
        #[test]
        fn overlay_never_returns_unpublished(filter in caller_filter()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_seeded_service(3).await;
                let articles = service.find(FilterPolicy::OverlayPublished, Some(filter)).await;
                prop_assert!(articles.iter().all(|a| a.published));
                Ok(())
            });
            result?;
        }

        /// The no-result route answers `[]` whatever the filter.
        #[test]
        fn no_result_route_is_constant(filter in caller_filter()) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let result: Result<(), TestCaseError> = rt.block_on(async {
                let service = setup_seeded_service(3).await;
                let articles = service
                    .find(FilterPolicy::OverlayPublishedNoResult, Some(filter))
                    .await;
                prop_assert!(articles.is_empty());
                Ok(())
            });
            result?;
        }
    }
}
