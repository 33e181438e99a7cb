//! Volatile in-process backing
//!
//! Tables are plain vectors kept in insertion order behind one
//! `tokio::sync::RwLock`, so every operation is atomic with respect to the
//! others in this process. Nothing here can fail on I/O.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{Repository, StoreError, StoreResult, UnreadCounts};
use crate::models::{
    board::{Board, BoardPatch, NewBoard},
    message::{Message, NewMessage},
    task::{Attachment, Comment, NewTask, Task, TaskPatch},
    team::{JoinOutcome, NewTeam, Team, TeamMember, TeamPatch},
    user::{NewUser, User, UserPatch, UserStats},
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    boards: Vec<Board>,
    tasks: Vec<Task>,
    messages: Vec<Message>,
    teams: Vec<Team>,
}

/// In-memory repository; clones share the same tables
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_mut<'a, T>(
    rows: &'a mut [T],
    entity: &'static str,
    pred: impl Fn(&T) -> bool,
) -> StoreResult<&'a mut T> {
    rows.iter_mut()
        .find(|row| pred(row))
        .ok_or(StoreError::not_found(entity))
}

fn remove_where<T>(rows: &mut Vec<T>, pred: impl Fn(&T) -> bool) -> bool {
    let before = rows.len();
    rows.retain(|row| !pred(row));
    rows.len() != before
}

#[async_trait]
impl Repository for MemoryStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().rev().cloned().collect())
    }

    async fn create_user(&self, data: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict { field: "email" });
        }

        let user = User::new(data);
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> StoreResult<User> {
        let mut tables = self.tables.write().await;

        if let Some(email) = &patch.email {
            if tables.users.iter().any(|u| &u.email == email && u.id != id) {
                return Err(StoreError::Conflict { field: "email" });
            }
        }

        let user = find_mut(&mut tables.users, "user", |u| u.id == id)?;
        user.apply(patch);
        Ok(user.clone())
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.users, |u| u.id == id))
    }

    async fn user_stats(&self) -> StoreResult<UserStats> {
        let tables = self.tables.read().await;
        Ok(UserStats::tally(&tables.users))
    }

    async fn find_board(&self, id: &str) -> StoreResult<Option<Board>> {
        let tables = self.tables.read().await;
        Ok(tables.boards.iter().find(|b| b.id == id).cloned())
    }

    async fn list_boards_for(&self, user_id: &str) -> StoreResult<Vec<Board>> {
        let tables = self.tables.read().await;
        Ok(tables
            .boards
            .iter()
            .filter(|b| b.owner == user_id || b.members.iter().any(|m| m == user_id))
            .cloned()
            .collect())
    }

    async fn create_board(&self, data: NewBoard) -> StoreResult<Board> {
        let board = Board::new(data);
        self.tables.write().await.boards.push(board.clone());
        Ok(board)
    }

    async fn update_board(&self, id: &str, patch: BoardPatch) -> StoreResult<Board> {
        let mut tables = self.tables.write().await;
        let board = find_mut(&mut tables.boards, "board", |b| b.id == id)?;
        board.apply(patch);
        Ok(board.clone())
    }

    async fn add_board_member(&self, id: &str, user_id: &str) -> StoreResult<Board> {
        let mut tables = self.tables.write().await;
        let board = find_mut(&mut tables.boards, "board", |b| b.id == id)?;
        board.add_member(user_id);
        Ok(board.clone())
    }

    async fn delete_board(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.boards, |b| b.id == id))
    }

    async fn find_task(&self, id: &str) -> StoreResult<Option<Task>> {
        let tables = self.tables.read().await;
        Ok(tables.tasks.iter().find(|t| t.id == id).cloned())
    }

    async fn list_tasks_by_team(&self, team_id: &str) -> StoreResult<Vec<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .iter()
            .filter(|t| t.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        let task = Task::new(data);
        self.tables.write().await.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        let task = find_mut(&mut tables.tasks, "task", |t| t.id == id)?;
        task.apply(patch);
        Ok(task.clone())
    }

    async fn add_task_comment(&self, id: &str, comment: Comment) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        let task = find_mut(&mut tables.tasks, "task", |t| t.id == id)?;
        task.comments.push(comment);
        task.updated_at = chrono::Utc::now();
        Ok(task.clone())
    }

    async fn add_task_attachment(&self, id: &str, attachment: Attachment) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;
        let task = find_mut(&mut tables.tasks, "task", |t| t.id == id)?;
        task.attachments.push(attachment);
        task.updated_at = chrono::Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.tasks, |t| t.id == id))
    }

    async fn create_message(&self, data: NewMessage) -> StoreResult<Message> {
        let message = Message::new(data);
        self.tables.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn conversation(&self, a: &str, b: &str) -> StoreResult<Vec<Message>> {
        let tables = self.tables.read().await;
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.is_between(a, b))
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    async fn mark_conversation_read(&self, reader: &str, other: &str) -> StoreResult<u64> {
        let mut tables = self.tables.write().await;
        let now = chrono::Utc::now();
        let mut marked = 0;

        for message in tables
            .messages
            .iter_mut()
            .filter(|m| m.from == other && m.is_unread_for(reader))
        {
            message.read_at = Some(now);
            marked += 1;
        }

        Ok(marked)
    }

    async fn unread_counts(&self, user_id: &str) -> StoreResult<UnreadCounts> {
        let tables = self.tables.read().await;
        let mut counts = UnreadCounts::new();

        for message in tables.messages.iter().filter(|m| m.is_unread_for(user_id)) {
            *counts.entry(message.from.clone()).or_insert(0) += 1;
        }

        Ok(counts)
    }

    async fn find_team(&self, id: &str) -> StoreResult<Option<Team>> {
        let tables = self.tables.read().await;
        Ok(tables.teams.iter().find(|t| t.id == id).cloned())
    }

    async fn list_teams(&self) -> StoreResult<Vec<Team>> {
        Ok(self.tables.read().await.teams.clone())
    }

    async fn list_teams_for_member(&self, user_id: &str) -> StoreResult<Vec<Team>> {
        let tables = self.tables.read().await;
        Ok(tables
            .teams
            .iter()
            .filter(|t| t.is_member(user_id))
            .cloned()
            .collect())
    }

    async fn create_team(&self, data: NewTeam) -> StoreResult<Team> {
        let team = Team::new(data);
        self.tables.write().await.teams.push(team.clone());
        Ok(team)
    }

    async fn update_team(&self, id: &str, patch: TeamPatch) -> StoreResult<Team> {
        let mut tables = self.tables.write().await;
        let team = find_mut(&mut tables.teams, "team", |t| t.id == id)?;
        team.apply(patch);
        Ok(team.clone())
    }

    async fn join_team(&self, id: &str, member: TeamMember) -> StoreResult<JoinOutcome> {
        let mut tables = self.tables.write().await;
        let team = find_mut(&mut tables.teams, "team", |t| t.id == id)?;
        Ok(team.join(member))
    }

    async fn delete_team(&self, id: &str) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        Ok(remove_where(&mut tables.teams, |t| t.id == id))
    }
}
