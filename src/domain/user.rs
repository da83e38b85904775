use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// A user profile document. One exists per authenticated principal; it is
/// created lazily the first time the principal touches the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Identifier assigned by the authentication provider.
    pub auth_id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(auth_id: impl Into<String>, email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            auth_id: auth_id.into(),
            email: email.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
