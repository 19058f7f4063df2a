//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles the operations needed for a specific entity.

pub mod article;
pub mod category;
pub mod department;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use category::{CategoryRepository, SqlxCategoryRepository};
pub use department::{DepartmentRepository, SqlxDepartmentRepository};
pub use user::{SqlxUserRepository, UserRepository};
