/// User model
///
/// Users are the only principals of the system. A user is created at
/// registration (or by an administrator), edited through the profile and
/// admin endpoints, and hard-deleted only by an administrator. Deleting a user
/// does not cascade: boards, tasks and teams that reference the id simply
/// resolve it as an unknown user.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('user', 'admin');
///
/// CREATE TABLE users (
///     id TEXT PRIMARY KEY,
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT NOT NULL,
///     name TEXT NOT NULL,
///     avatar_url TEXT,
///     role user_role NOT NULL DEFAULT 'user',
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     last_login TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```
/// use teamboard_shared::models::user::{normalize_email, NewUser, User, UserRole};
///
/// let user = User::new(NewUser {
///     email: normalize_email("  Alice@Example.com "),
///     password_hash: "$argon2id$...".to_string(),
///     name: "alice".to_string(),
///     role: UserRole::User,
///     avatar_url: None,
/// });
///
/// assert_eq!(user.email, "alice@example.com");
/// assert!(user.is_active);
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::new_id;

/// Account role
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular member
    #[default]
    User,

    /// Administrator with access to `/api/admin`
    Admin,
}

impl UserRole {
    /// Converts role to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
        }
    }

    /// Checks if the role grants administrative access
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(UserRole::User),
            "admin" => Ok(UserRole::Admin),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User account
///
/// The password hash is never serialized outward; every response that embeds
/// a user goes through this type's `Serialize` impl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique user ID (UUID v4 string)
    pub id: String,

    /// Trimmed, lowercased email address; unique across all users
    pub email: String,

    /// Argon2id password hash (PHC string)
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Display name
    pub name: String,

    /// Public URL of the uploaded avatar, if any
    pub avatar_url: Option<String>,

    /// Account role
    pub role: UserRole,

    /// Whether the account is active
    pub is_active: bool,

    /// Last successful login
    pub last_login: Option<DateTime<Utc>>,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last modified
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Email address; callers normalize with [`normalize_email`] first
    pub email: String,

    /// Argon2id hash, never the plaintext password
    pub password_hash: String,

    /// Display name
    pub name: String,

    /// Account role
    pub role: UserRole,

    /// Optional avatar URL
    pub avatar_url: Option<String>,
}

/// Partial update of a user; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Aggregate account counts for the admin dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub total_users: i64,
    pub active_users: i64,
    pub inactive_users: i64,
    pub admin_users: i64,
    pub regular_users: i64,
}

impl User {
    /// Builds a fresh user with a new ID and current timestamps
    pub fn new(data: NewUser) -> Self {
        let now = Utc::now();

        Self {
            id: new_id(),
            email: data.email,
            password_hash: data.password_hash,
            name: data.name,
            avatar_url: data.avatar_url,
            role: data.role,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch in place and bumps `updated_at`
    pub fn apply(&mut self, patch: UserPatch) {
        if let Some(email) = patch.email {
            self.email = email;
        }
        if let Some(password_hash) = patch.password_hash {
            self.password_hash = password_hash;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(avatar_url) = patch.avatar_url {
            self.avatar_url = Some(avatar_url);
        }
        if let Some(role) = patch.role {
            self.role = role;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        if let Some(last_login) = patch.last_login {
            self.last_login = Some(last_login);
        }
        self.updated_at = Utc::now();
    }
}

impl UserStats {
    /// Computes statistics by iterating over a set of users
    pub fn tally<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        let mut stats = UserStats::default();

        for user in users {
            stats.total_users += 1;
            if user.is_active {
                stats.active_users += 1;
            }
            match user.role {
                UserRole::Admin => stats.admin_users += 1,
                UserRole::User => stats.regular_users += 1,
            }
        }

        stats.inactive_users = stats.total_users - stats.active_users;
        stats
    }
}

/// Normalizes an email for storage and lookup (trimmed, lowercased)
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Default display name derived from the local part of an email
pub fn default_display_name(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}
