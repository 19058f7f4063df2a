//! Services layer
//!
//! This module contains the request-path logic of the article API:
//! - Filter policies deciding how caller input becomes a query
//! - The article query service running them against the store

pub mod article;
pub mod filter_policy;

pub use article::{ArticleQueryError, ArticleQueryService};
pub use filter_policy::FilterPolicy;
