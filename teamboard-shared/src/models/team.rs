/// Team model
///
/// A team owns an ordered member list capped at `settings.maxMembers`. The
/// creator is the first member and the only one with the `owner` role;
/// everyone who joins afterwards is a `member`. Joining twice is a no-op.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id TEXT PRIMARY KEY,
///     name TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     settings JSONB NOT NULL,
///     members JSONB NOT NULL DEFAULT '[]',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::User;

/// Default member cap for new teams
pub const DEFAULT_MAX_MEMBERS: u32 = 10;

/// Team-level switches
///
/// Missing fields in a client payload fall back to the defaults, so
/// `{"maxMembers": 3}` yields a complete settings object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamSettings {
    pub allow_member_invites: bool,
    pub allow_task_creation: bool,
    pub allow_task_assignment: bool,
    pub max_members: u32,
    pub visibility: String,
}

impl Default for TeamSettings {
    fn default() -> Self {
        Self {
            allow_member_invites: true,
            allow_task_creation: true,
            allow_task_assignment: true,
            max_members: DEFAULT_MAX_MEMBERS,
            visibility: "public".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Owner,
    Member,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: TeamRole,
    pub is_active: bool,
}

impl TeamMember {
    /// Builds a member entry from an identity; empty names fall back to the email
    pub fn new(user_id: &str, email: &str, name: &str, role: TeamRole) -> Self {
        let name = if name.trim().is_empty() { email } else { name };

        Self {
            user_id: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            is_active: true,
        }
    }

    pub fn from_user(user: &User, role: TeamRole) -> Self {
        Self::new(&user.id, &user.email, &user.name, role)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    /// `team_<uuid>`
    pub id: String,
    pub name: String,
    pub description: String,
    pub settings: TeamSettings,

    /// Members in join order; the first entry is the owner
    pub members: Vec<TeamMember>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    pub description: String,
    pub settings: TeamSettings,
    pub owner: TeamMember,
}

#[derive(Debug, Clone, Default)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<TeamSettings>,
}

/// Result of a join attempt
#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// The user was appended to the member list
    Joined(Team),

    /// The user was already a member; nothing changed
    AlreadyMember(Team),

    /// The team is at `settings.maxMembers`; nothing changed
    Full(Team),
}

impl Team {
    pub fn new(data: NewTeam) -> Self {
        let now = Utc::now();
        let mut owner = data.owner;
        owner.role = TeamRole::Owner;

        Self {
            id: format!("team_{}", uuid::Uuid::new_v4()),
            name: data.name,
            description: data.description,
            settings: data.settings,
            members: vec![owner],
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    /// Effective member cap (a zero cap is treated as the default)
    pub fn capacity(&self) -> usize {
        match self.settings.max_members {
            0 => DEFAULT_MAX_MEMBERS as usize,
            n => n as usize,
        }
    }

    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity()
    }

    /// Applies the join rules in place
    pub fn join(&mut self, member: TeamMember) -> JoinOutcome {
        if self.is_member(&member.user_id) {
            return JoinOutcome::AlreadyMember(self.clone());
        }
        if self.is_full() {
            return JoinOutcome::Full(self.clone());
        }

        self.members.push(TeamMember {
            role: TeamRole::Member,
            ..member
        });
        self.updated_at = Utc::now();
        JoinOutcome::Joined(self.clone())
    }

    pub fn apply(&mut self, patch: TeamPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(settings) = patch.settings {
            self.settings = settings;
        }
        self.updated_at = Utc::now();
    }
}
