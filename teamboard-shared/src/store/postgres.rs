//! Durable PostgreSQL backing
//!
//! Queries are plain runtime `sqlx::query_as` calls. Nested documents
//! (assignees, comments, attachments, team settings and members) live in
//! JSONB columns and are decoded through `sqlx::types::Json`.
//!
//! Connection-class failures are reported as [`StoreError::Unavailable`] and
//! also flip the shared [`BackendHealth`] flag, so the very next request is
//! routed to the volatile backing instead of failing again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{types::Json, PgPool};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, error, warn};

use super::{Repository, StoreError, StoreResult, UnreadCounts};
use crate::db::{migrations::run_migrations, pool::health_check};
use crate::models::{
    board::{Board, BoardPatch, NewBoard},
    message::{Message, NewMessage},
    task::{Attachment, Comment, NewTask, Task, TaskPatch, TaskPriority, TaskStatus},
    team::{
        JoinOutcome, NewTeam, Team, TeamMember, TeamPatch, TeamRole, TeamSettings,
        DEFAULT_MAX_MEMBERS,
    },
    user::{NewUser, User, UserPatch, UserStats},
};

const USER_COLUMNS: &str = "id, email, password_hash, name, avatar_url, role, is_active, \
                            last_login, created_at, updated_at";
const BOARD_COLUMNS: &str = "id, title, owner, members, data, created_at, updated_at";
const TASK_COLUMNS: &str = "id, team_id, title, description, assigned_to, status, priority, \
                            due_date, attachments, comments, created_by, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, sender, recipient, body, read_at, created_at";
const TEAM_COLUMNS: &str = "id, name, description, settings, members, created_at, updated_at";

/// Reachability of the database as last observed
#[derive(Debug, Default)]
pub struct BackendHealth {
    reachable: AtomicBool,
    migrated: AtomicBool,
}

impl BackendHealth {
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Acquire)
    }

    /// Records a new reachability state; returns the previous one
    fn set_reachable(&self, reachable: bool) -> bool {
        self.reachable.swap(reachable, Ordering::AcqRel)
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    team_id: String,
    title: String,
    description: String,
    assigned_to: Json<Vec<String>>,
    status: TaskStatus,
    priority: TaskPriority,
    due_date: Option<String>,
    attachments: Json<Vec<Attachment>>,
    comments: Json<Vec<Comment>>,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            team_id: row.team_id,
            title: row.title,
            description: row.description,
            assigned_to: row.assigned_to.0,
            status: row.status,
            priority: row.priority,
            due_date: row.due_date,
            attachments: row.attachments.0,
            comments: row.comments.0,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TeamRow {
    id: String,
    name: String,
    description: String,
    settings: Json<TeamSettings>,
    members: Json<Vec<TeamMember>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TeamRow> for Team {
    fn from(row: TeamRow) -> Self {
        Team {
            id: row.id,
            name: row.name,
            description: row.description,
            settings: row.settings.0,
            members: row.members.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    health: Arc<BackendHealth>,
}

impl PgStore {
    /// Wraps a pool; the backend counts as unreachable until the first
    /// successful [`PgStore::probe`]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            health: Arc::new(BackendHealth::default()),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn is_reachable(&self) -> bool {
        self.health.is_reachable()
    }

    /// Pings the database and updates the reachability flag
    ///
    /// Migrations run once, the first time the database answers. A failed
    /// migration keeps the backend marked unreachable.
    pub async fn probe(&self) -> bool {
        let reachable = match health_check(&self.pool).await {
            Ok(()) => self.ensure_migrated().await,
            Err(e) => {
                debug!(error = %e, "Database health check failed");
                false
            }
        };

        let was = self.health.set_reachable(reachable);
        match (was, reachable) {
            (false, true) => warn!(
                "Persistent storage reachable; serving from database, volatile writes are not migrated"
            ),
            (true, false) => {
                warn!("Persistent storage lost; serving from volatile storage")
            }
            _ => {}
        }

        reachable
    }

    async fn ensure_migrated(&self) -> bool {
        if self.health.migrated.load(Ordering::Acquire) {
            return true;
        }

        match run_migrations(&self.pool).await {
            Ok(()) => {
                self.health.migrated.store(true, Ordering::Release);
                true
            }
            Err(e) => {
                error!(error = %e, "Database migrations failed");
                false
            }
        }
    }

    /// Maps a sqlx error, marking the backend down on connection failures
    fn classify(&self, err: sqlx::Error) -> StoreError {
        match &err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => {
                if self.health.set_reachable(false) {
                    warn!(error = %err, "Persistent storage lost; serving from volatile storage");
                }
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict { field: "email" }
            }
            _ => StoreError::Internal(err.to_string()),
        }
    }

    async fn fetch_task(&self, sql: &str, id: &str) -> StoreResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.classify(e))?;

        Ok(row.map(Task::from))
    }
}

#[async_trait]
impl Repository for PgStore {
    async fn find_user(&self, id: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.classify(e))
    }

    async fn create_user(&self, data: NewUser) -> StoreResult<User> {
        let user = User::new(data);

        sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users ({USER_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.avatar_url)
        .bind(user.role)
        .bind(user.is_active)
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| self.classify(e))
    }

    async fn update_user(&self, id: &str, patch: UserPatch) -> StoreResult<User> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                name = COALESCE($4, name),
                avatar_url = COALESCE($5, avatar_url),
                role = COALESCE($6, role),
                is_active = COALESCE($7, is_active),
                last_login = COALESCE($8, last_login),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.email)
        .bind(patch.password_hash)
        .bind(patch.name)
        .bind(patch.avatar_url)
        .bind(patch.role)
        .bind(patch.is_active)
        .bind(patch.last_login)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?
        .ok_or(StoreError::not_found("user"))
    }

    async fn delete_user(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.classify(e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn user_stats(&self) -> StoreResult<UserStats> {
        let (total_users, active_users, admin_users, regular_users): (i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COUNT(*) FILTER (WHERE is_active),
                    COUNT(*) FILTER (WHERE role = 'admin'),
                    COUNT(*) FILTER (WHERE role = 'user')
                FROM users
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(|e| self.classify(e))?;

        Ok(UserStats {
            total_users,
            active_users,
            inactive_users: total_users - active_users,
            admin_users,
            regular_users,
        })
    }

    async fn find_board(&self, id: &str) -> StoreResult<Option<Board>> {
        sqlx::query_as::<_, Board>(&format!("SELECT {BOARD_COLUMNS} FROM boards WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn list_boards_for(&self, user_id: &str) -> StoreResult<Vec<Board>> {
        sqlx::query_as::<_, Board>(&format!(
            r#"
            SELECT {BOARD_COLUMNS} FROM boards
            WHERE owner = $1 OR $1 = ANY(members)
            ORDER BY created_at ASC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.classify(e))
    }

    async fn create_board(&self, data: NewBoard) -> StoreResult<Board> {
        let board = Board::new(data);

        sqlx::query_as::<_, Board>(&format!(
            r#"
            INSERT INTO boards ({BOARD_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {BOARD_COLUMNS}
            "#
        ))
        .bind(&board.id)
        .bind(&board.title)
        .bind(&board.owner)
        .bind(&board.members)
        .bind(&board.data)
        .bind(board.created_at)
        .bind(board.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| self.classify(e))
    }

    async fn update_board(&self, id: &str, patch: BoardPatch) -> StoreResult<Board> {
        sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards SET
                title = COALESCE($2, title),
                data = COALESCE($3, data),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {BOARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.data)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?
        .ok_or(StoreError::not_found("board"))
    }

    async fn add_board_member(&self, id: &str, user_id: &str) -> StoreResult<Board> {
        let updated = sqlx::query_as::<_, Board>(&format!(
            r#"
            UPDATE boards SET
                members = array_append(members, $2),
                updated_at = NOW()
            WHERE id = $1 AND NOT ($2 = ANY(members))
            RETURNING {BOARD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        match updated {
            Some(board) => Ok(board),
            // Already a member, or no such board
            None => self
                .find_board(id)
                .await?
                .ok_or(StoreError::not_found("board")),
        }
    }

    async fn delete_board(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.classify(e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_task(&self, id: &str) -> StoreResult<Option<Task>> {
        self.fetch_task(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"), id)
            .await
    }

    async fn list_tasks_by_team(&self, team_id: &str) -> StoreResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE team_id = $1 ORDER BY created_at ASC"
        ))
        .bind(team_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        Ok(rows.into_iter().map(Task::from).collect())
    }

    async fn create_task(&self, data: NewTask) -> StoreResult<Task> {
        let task = Task::new(data);

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            INSERT INTO tasks ({TASK_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(&task.id)
        .bind(&task.team_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(Json(&task.assigned_to))
        .bind(task.status)
        .bind(task.priority)
        .bind(&task.due_date)
        .bind(Json(&task.attachments))
        .bind(Json(&task.comments))
        .bind(&task.created_by)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        Ok(row.into())
    }

    async fn update_task(&self, id: &str, patch: TaskPatch) -> StoreResult<Task> {
        let replace_due_date = patch.due_date.is_some();

        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                assigned_to = COALESCE($4, assigned_to),
                status = COALESCE($5, status),
                priority = COALESCE($6, priority),
                due_date = CASE WHEN $8 THEN $7 ELSE due_date END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.title)
        .bind(patch.description)
        .bind(patch.assigned_to.map(Json))
        .bind(patch.status)
        .bind(patch.priority)
        .bind(patch.due_date.flatten())
        .bind(replace_due_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        row.map(Task::from).ok_or(StoreError::not_found("task"))
    }

    async fn add_task_comment(&self, id: &str, comment: Comment) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks SET comments = comments || $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json([comment]))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        row.map(Task::from).ok_or(StoreError::not_found("task"))
    }

    async fn add_task_attachment(&self, id: &str, attachment: Attachment) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(&format!(
            r#"
            UPDATE tasks SET attachments = attachments || $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json([attachment]))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        row.map(Task::from).ok_or(StoreError::not_found("task"))
    }

    async fn delete_task(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.classify(e))?;

        Ok(result.rows_affected() > 0)
    }

    async fn create_message(&self, data: NewMessage) -> StoreResult<Message> {
        let message = Message::new(data);

        sqlx::query_as::<_, Message>(&format!(
            r#"
            INSERT INTO messages ({MESSAGE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {MESSAGE_COLUMNS}
            "#
        ))
        .bind(&message.id)
        .bind(&message.from)
        .bind(&message.to)
        .bind(&message.body)
        .bind(message.read_at)
        .bind(message.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| self.classify(e))
    }

    async fn conversation(&self, a: &str, b: &str) -> StoreResult<Vec<Message>> {
        sqlx::query_as::<_, Message>(&format!(
            r#"
            SELECT {MESSAGE_COLUMNS} FROM messages
            WHERE (sender = $1 AND recipient = $2) OR (sender = $2 AND recipient = $1)
            ORDER BY created_at ASC
            "#
        ))
        .bind(a)
        .bind(b)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.classify(e))
    }

    async fn mark_conversation_read(&self, reader: &str, other: &str) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET read_at = NOW()
            WHERE sender = $2 AND recipient = $1 AND read_at IS NULL
            "#,
        )
        .bind(reader)
        .bind(other)
        .execute(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        Ok(result.rows_affected())
    }

    async fn unread_counts(&self, user_id: &str) -> StoreResult<UnreadCounts> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT sender, COUNT(*) FROM messages
            WHERE recipient = $1 AND read_at IS NULL
            GROUP BY sender
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        Ok(rows.into_iter().collect())
    }

    async fn find_team(&self, id: &str) -> StoreResult<Option<Team>> {
        let row = sqlx::query_as::<_, TeamRow>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        Ok(row.map(Team::from))
    }

    async fn list_teams(&self) -> StoreResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(&format!(
            "SELECT {TEAM_COLUMNS} FROM teams ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        Ok(rows.into_iter().map(Team::from).collect())
    }

    async fn list_teams_for_member(&self, user_id: &str) -> StoreResult<Vec<Team>> {
        let rows = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            SELECT {TEAM_COLUMNS} FROM teams
            WHERE members @> $1
            ORDER BY created_at ASC
            "#
        ))
        .bind(Json(json!([{ "userId": user_id }])))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        Ok(rows.into_iter().map(Team::from).collect())
    }

    async fn create_team(&self, data: NewTeam) -> StoreResult<Team> {
        let team = Team::new(data);

        let row = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            INSERT INTO teams ({TEAM_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(&team.id)
        .bind(&team.name)
        .bind(&team.description)
        .bind(Json(&team.settings))
        .bind(Json(&team.members))
        .bind(team.created_at)
        .bind(team.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        Ok(row.into())
    }

    async fn update_team(&self, id: &str, patch: TeamPatch) -> StoreResult<Team> {
        let row = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            UPDATE teams SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                settings = COALESCE($4, settings),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(patch.name)
        .bind(patch.description)
        .bind(patch.settings.map(Json))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        row.map(Team::from).ok_or(StoreError::not_found("team"))
    }

    async fn join_team(&self, id: &str, member: TeamMember) -> StoreResult<JoinOutcome> {
        let member = TeamMember {
            role: TeamRole::Member,
            ..member
        };

        // The row lock taken by UPDATE serializes concurrent joins, and the
        // WHERE clause is re-evaluated after the lock, so the cap holds.
        let joined = sqlx::query_as::<_, TeamRow>(&format!(
            r#"
            UPDATE teams SET
                members = members || $2,
                updated_at = NOW()
            WHERE id = $1
              AND NOT members @> $3
              AND jsonb_array_length(members) < CASE
                    WHEN COALESCE((settings->>'maxMembers')::int, 0) <= 0 THEN $4
                    ELSE (settings->>'maxMembers')::int
                  END
            RETURNING {TEAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(Json([&member]))
        .bind(Json(json!([{ "userId": member.user_id }])))
        .bind(DEFAULT_MAX_MEMBERS as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| self.classify(e))?;

        if let Some(row) = joined {
            return Ok(JoinOutcome::Joined(row.into()));
        }

        let team = self
            .find_team(id)
            .await?
            .ok_or(StoreError::not_found("team"))?;

        if team.is_member(&member.user_id) {
            Ok(JoinOutcome::AlreadyMember(team))
        } else {
            Ok(JoinOutcome::Full(team))
        }
    }

    async fn delete_team(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM teams WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| self.classify(e))?;

        Ok(result.rows_affected() > 0)
    }
}
