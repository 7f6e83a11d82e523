//! Office user domain model.

use serde::{Deserialize, Serialize};

/// A staff member of the office. Users are provisioned by the auth
/// collaborator; this backend only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}
