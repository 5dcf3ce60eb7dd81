// common/src/models/user.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A wallet identity. `address` is always lower-cased.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub address: String,
    /// Outstanding sign-in challenge, cleared once consumed
    pub nonce: Option<String>,
    /// Set once a payment has been confirmed for this user
    pub has_access: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(address: String, nonce: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            address,
            nonce,
            has_access: false,
            created_at: Utc::now(),
        }
    }
}
