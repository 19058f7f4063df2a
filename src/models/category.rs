//! Category model

use serde::{Deserialize, Serialize};

/// Category entity; many-to-many with articles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Category name (not unique)
    pub name: String,
}
