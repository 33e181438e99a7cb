//! Storage-agnostic repository
//!
//! Every handler talks to a [`Repository`]. Two implementations exist:
//!
//! - [`memory::MemoryStore`]: process-local tables behind an async lock. It
//!   never fails on I/O grounds and loses everything on restart.
//! - [`postgres::PgStore`]: durable tables in PostgreSQL, with documents
//!   (members, comments, settings) kept in JSONB columns.
//!
//! [`dual::Storage`] owns one of each and picks the backing per call, based on
//! whether the database is reachable right now. Both implementations build
//! entities through the model constructors and `apply` methods so that the
//! same operation yields the same document on either side.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::models::{
    board::{Board, BoardPatch, NewBoard},
    message::{Message, NewMessage},
    task::{Attachment, Comment, NewTask, Task, TaskPatch},
    team::{JoinOutcome, NewTeam, Team, TeamMember, TeamPatch},
    user::{NewUser, User, UserPatch, UserStats},
};

pub mod dual;
pub mod memory;
pub mod postgres;

pub use dual::{Backing, Storage};
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors surfaced by a repository
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The targeted entity does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A uniqueness rule was violated (currently only user email)
    #[error("duplicate {field}")]
    Conflict { field: &'static str },

    /// The persistent backend could not be reached
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("storage error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        StoreError::NotFound { entity }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Unread message counts keyed by sender ID
pub type UnreadCounts = BTreeMap<String, i64>;

/// Query surface over users, boards, tasks, messages and teams
///
/// All lookups that can legitimately miss return `Option`; updates of a
/// missing entity return `StoreError::NotFound`; deletes report whether
/// anything was removed.
#[async_trait]
pub trait Repository: Send + Sync {
    // ----- users -----

    async fn find_user(&self, id: &str) -> StoreResult<Option<User>>;

    /// Looks up by normalized email
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// All users, newest first
    async fn list_users(&self) -> StoreResult<Vec<User>>;

    /// Fails with `Conflict { field: "email" }` if the email is taken
    async fn create_user(&self, data: NewUser) -> StoreResult<User>;

    async fn update_user(&self, id: &str, patch: UserPatch) -> StoreResult<User>;

    async fn delete_user(&self, id: &str) -> StoreResult<bool>;

    async fn user_stats(&self) -> StoreResult<UserStats>;

    // ----- boards -----

    async fn find_board(&self, id: &str) -> StoreResult<Option<Board>>;

    /// Boards the user owns or is a member of, oldest first
    async fn list_boards_for(&self, user_id: &str) -> StoreResult<Vec<Board>>;

    async fn create_board(&self, data: NewBoard) -> StoreResult<Board>;

    async fn update_board(&self, id: &str, patch: BoardPatch) -> StoreResult<Board>;

    /// Adds a member unless already present
    async fn add_board_member(&self, id: &str, user_id: &str) -> StoreResult<Board>;

    async fn delete_board(&self, id: &str) -> StoreResult<bool>;

    // ----- tasks -----

    async fn find_task(&self, id: &str) -> StoreResult<Option<Task>>;

    /// Tasks of a team, oldest first
    async fn list_tasks_by_team(&self, team_id: &str) -> StoreResult<Vec<Task>>;

    async fn create_task(&self, data: NewTask) -> StoreResult<Task>;

    async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult<Task>;

    async fn add_task_comment(&self, id: &str, comment: Comment) -> StoreResult<Task>;

    async fn add_task_attachment(&self, id: &str, attachment: Attachment) -> StoreResult<Task>;

    async fn delete_task(&self, id: &str) -> StoreResult<bool>;

    // ----- messages -----

    async fn create_message(&self, data: NewMessage) -> StoreResult<Message>;

    /// Messages between two users in creation order
    async fn conversation(&self, a: &str, b: &str) -> StoreResult<Vec<Message>>;

    /// Marks everything `other` sent to `reader` as read; returns how many
    async fn mark_conversation_read(&self, reader: &str, other: &str) -> StoreResult<u64>;

    /// Unread messages addressed to `user_id`, counted per sender
    async fn unread_counts(&self, user_id: &str) -> StoreResult<UnreadCounts>;

    // ----- teams -----

    async fn find_team(&self, id: &str) -> StoreResult<Option<Team>>;

    /// All teams, oldest first
    async fn list_teams(&self) -> StoreResult<Vec<Team>>;

    /// Teams that list `user_id` as a member
    async fn list_teams_for_member(&self, user_id: &str) -> StoreResult<Vec<Team>>;

    async fn create_team(&self, data: NewTeam) -> StoreResult<Team>;

    async fn update_team(&self, id: &str, patch: TeamPatch) -> StoreResult<Team>;

    /// Applies the join rules atomically; never exceeds the member cap
    async fn join_team(&self, id: &str, member: TeamMember) -> StoreResult<JoinOutcome>;

    async fn delete_team(&self, id: &str) -> StoreResult<bool>;
}
