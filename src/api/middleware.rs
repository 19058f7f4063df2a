//! API shared state
//!
//! `AppState` holds the handles every handler receives. The store handle is
//! opened in `main` and passed in here; nothing reaches it through globals.

use std::sync::Arc;

use crate::db::repositories::SqlxArticleRepository;
use crate::db::DynDatabasePool;
use crate::services::ArticleQueryService;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub article_service: Arc<ArticleQueryService>,
}

impl AppState {
    /// Wire the article service onto `pool`
    pub fn new(pool: DynDatabasePool) -> Self {
        let article_service =
            Arc::new(ArticleQueryService::new(SqlxArticleRepository::boxed(pool)));
        Self { article_service }
    }
}
