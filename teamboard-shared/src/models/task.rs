/// Task model
///
/// Tasks belong to a team and are the unit of work shown on a team board.
/// Every successful write to a task is announced to the `teamBoard:<teamId>`
/// room by the API layer.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM ('todo', 'in-progress', 'done');
/// CREATE TYPE task_priority AS ENUM ('low', 'medium', 'high');
///
/// CREATE TABLE tasks (
///     id TEXT PRIMARY KEY,
///     team_id TEXT NOT NULL,
///     title TEXT NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     assigned_to JSONB NOT NULL DEFAULT '[]',
///     status task_status NOT NULL DEFAULT 'todo',
///     priority task_priority NOT NULL DEFAULT 'medium',
///     due_date TEXT,
///     attachments JSONB NOT NULL DEFAULT '[]',
///     comments JSONB NOT NULL DEFAULT '[]',
///     created_by TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```
/// use teamboard_shared::models::task::{NewTask, Task, TaskPriority, TaskStatus};
///
/// let task = Task::new(NewTask {
///     team_id: "team_1".to_string(),
///     title: "Write release notes".to_string(),
///     description: String::new(),
///     assigned_to: vec![],
///     status: TaskStatus::Todo,
///     priority: TaskPriority::High,
///     due_date: None,
///     created_by: "user-1".to_string(),
/// });
///
/// assert_eq!(task.status.as_str(), "todo");
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::new_id;

/// Workflow column of a task
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_status", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
        }
    }
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "task_priority", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

/// File attached to a task; `url` points under `/uploads`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(author_id: &str, text: &str) -> Self {
        Self {
            id: new_id(),
            author_id: author_id.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,

    /// Owning team
    pub team_id: String,

    pub title: String,
    pub description: String,

    /// Assignee user IDs
    pub assigned_to: Vec<String>,

    pub status: TaskStatus,
    pub priority: TaskPriority,

    /// Free-form due date as sent by the client (usually `YYYY-MM-DD`)
    pub due_date: Option<String>,

    pub attachments: Vec<Attachment>,
    pub comments: Vec<Comment>,

    /// User who created the task
    pub created_by: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTask {
    pub team_id: String,
    pub title: String,
    pub description: String,
    pub assigned_to: Vec<String>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<String>,
    pub created_by: String,
}

/// Partial task update, deserialized straight from a `PUT /api/tasks/:id` body
///
/// Identity and ownership fields (`id`, `teamId`, `createdBy`) are not part of
/// the patch and are ignored if a client sends them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_assignees")]
    pub assigned_to: Option<Vec<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    /// `Some(None)` clears the due date (`"dueDate": null` or `""`)
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<Option<String>>,
}

impl Task {
    pub fn new(data: NewTask) -> Self {
        let now = Utc::now();

        Self {
            id: new_id(),
            team_id: data.team_id,
            title: data.title,
            description: data.description,
            assigned_to: data.assigned_to,
            status: data.status,
            priority: data.priority,
            due_date: data.due_date,
            attachments: Vec::new(),
            comments: Vec::new(),
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, patch: TaskPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(assigned_to) = patch.assigned_to {
            self.assigned_to = assigned_to;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        self.updated_at = Utc::now();
    }
}

/// Checks a task ID taken from a request path
///
/// Clients have been seen sending the literal string `undefined` when they
/// lost track of an ID; both that and the empty string are rejected.
pub fn is_valid_task_id(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty() && id != "undefined"
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accepts `assignedTo` either as a single user ID or as a list
pub fn deserialize_assignees<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<OneOrMany>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(id) if id.is_empty() => Vec::new(),
        OneOrMany::One(id) => vec![id],
        OneOrMany::Many(ids) => ids,
    }))
}

/// Distinguishes an absent `dueDate` from an explicit `null`
pub fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(Some(value.filter(|d| !d.trim().is_empty())))
}
