//! Data models
//!
//! This module contains the data structures of the article store:
//! - Database entities (Article, User, Department, Category)
//! - Input types used by the seed loader

mod article;
mod category;
mod department;
mod user;

pub use article::{Article, CreateArticleInput};
pub use category::Category;
pub use department::Department;
pub use user::{CreateUserInput, User};
