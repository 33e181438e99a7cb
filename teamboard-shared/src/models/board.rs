/// Board model
///
/// A board is an owner-scoped document with an opaque JSON payload. Access is
/// granted to the owner and to every user id in `members`; only the owner can
/// extend `members` (see [`crate::auth::authorization`]).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id TEXT PRIMARY KEY,
///     title TEXT NOT NULL,
///     owner TEXT NOT NULL,
///     members TEXT[] NOT NULL DEFAULT '{}',
///     data JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::new_id;

/// Title given to boards created without one
pub const DEFAULT_BOARD_TITLE: &str = "Untitled Board";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub id: String,
    pub title: String,

    /// Owning user ID
    pub owner: String,

    /// User IDs the board has been shared with (no duplicates)
    pub members: Vec<String>,

    /// Opaque client payload
    pub data: JsonValue,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBoard {
    pub title: String,
    pub owner: String,
    pub data: JsonValue,
}

#[derive(Debug, Clone, Default)]
pub struct BoardPatch {
    pub title: Option<String>,
    pub data: Option<JsonValue>,
}

impl Board {
    pub fn new(data: NewBoard) -> Self {
        let now = Utc::now();

        Self {
            id: new_id(),
            title: data.title,
            owner: data.owner,
            members: Vec::new(),
            data: data.data,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: BoardPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(data) = patch.data {
            self.data = data;
        }
        self.updated_at = Utc::now();
    }

    /// Adds a member if not already present; returns whether it was added
    pub fn add_member(&mut self, user_id: &str) -> bool {
        if self.members.iter().any(|m| m == user_id) {
            return false;
        }
        self.members.push(user_id.to_string());
        self.updated_at = Utc::now();
        true
    }
}
