//! Department model

use serde::{Deserialize, Serialize};

/// Department entity; many-to-many with users
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}
