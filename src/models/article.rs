//! Article model
//!
//! This module provides:
//! - `Article` entity, the only record type served at runtime
//! - `CreateArticleInput` used when populating the store

use serde::{Deserialize, Serialize};

use super::{Category, User};

/// Article entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Unique identifier
    pub id: i64,
    /// Article title
    pub title: String,
    /// Article body
    pub body: String,
    /// Whether the article is publicly visible
    pub published: bool,
    /// Owning user ID
    pub created_by_id: i64,
    /// Owning user, present only when requested through `include`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<User>,
    /// Linked categories, present only when requested through `include`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,
}

/// Input for creating a new article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateArticleInput {
    /// Article title
    pub title: String,
    /// Article body
    pub body: String,
    /// Publication flag (defaults to unpublished)
    pub published: Option<bool>,
    /// Owning user ID
    pub created_by_id: i64,
    /// Existing categories to link
    #[serde(default)]
    pub category_ids: Vec<i64>,
    /// Names of categories to create and link
    #[serde(default)]
    pub new_categories: Vec<String>,
}

impl CreateArticleInput {
    /// Create a new unpublished article input
    pub fn new(title: impl Into<String>, body: impl Into<String>, created_by_id: i64) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            published: None,
            created_by_id,
            category_ids: Vec::new(),
            new_categories: Vec::new(),
        }
    }

    /// Set the publication flag
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = Some(published);
        self
    }

    /// Link an existing category
    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_ids.push(category_id);
        self
    }

    /// Create a new category with the given name and link it
    pub fn with_new_category(mut self, name: impl Into<String>) -> Self {
        self.new_categories.push(name.into());
        self
    }

    /// Effective publication flag
    pub fn is_published(&self) -> bool {
        self.published.unwrap_or(false)
    }
}
