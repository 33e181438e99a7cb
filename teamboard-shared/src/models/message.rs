/// Direct message model
///
/// A conversation is identified by the unordered pair of participants. A
/// message is unread while `read_at` is `None`; only the recipient can mark it
/// read.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE messages (
///     id TEXT PRIMARY KEY,
///     sender TEXT NOT NULL,
///     recipient TEXT NOT NULL,
///     body TEXT NOT NULL,
///     read_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,

    /// Sender user ID
    #[sqlx(rename = "sender")]
    pub from: String,

    /// Recipient user ID
    #[sqlx(rename = "recipient")]
    pub to: String,

    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    pub from: String,
    pub to: String,
    pub body: String,
}

impl Message {
    pub fn new(data: NewMessage) -> Self {
        Self {
            id: new_id(),
            from: data.from,
            to: data.to,
            body: data.body,
            read_at: None,
            created_at: Utc::now(),
        }
    }

    /// Whether this message belongs to the conversation between `a` and `b`
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    pub fn is_unread_for(&self, user_id: &str) -> bool {
        self.to == user_id && self.read_at.is_none()
    }
}
