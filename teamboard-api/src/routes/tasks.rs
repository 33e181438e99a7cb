/// Task endpoints
///
/// Every successful write is announced to `teamBoard:<teamId>` as
/// `teamBoard:update`, carrying `{task}` or, for deletes, `{deletedTaskId}`.
///
/// # Endpoints
///
/// - `GET /api/tasks/team/:team_id` - Tasks of a team
/// - `POST /api/tasks/team/:team_id` - Create a task
/// - `PUT /api/tasks/:id` - Update a task
/// - `DELETE /api/tasks/:id` - Delete a task
/// - `POST /api/tasks/:id/comments` - Append a comment
/// - `POST /api/tasks/:id/attachments` - Attach a file (multipart field `file`)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::{non_blank, uploads},
};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use teamboard_shared::{
    auth::gate::Principal,
    models::{
        new_id,
        task::{
            deserialize_assignees, is_valid_task_id, Attachment, Comment, NewTask, Task,
            TaskPatch, TaskPriority, TaskStatus,
        },
    },
    realtime::events::{Room, TEAM_BOARD_UPDATE},
};
use tracing::{debug, info};
use validator::Validate;

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    /// A single user ID or a list of them
    #[serde(default, deserialize_with = "deserialize_assignees")]
    pub assigned_to: Option<Vec<String>>,

    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<String>,
}

/// Comment request
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[validate(length(max = 2000, message = "Comment must be at most 2000 characters"))]
    pub text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

fn check_task_id(id: &str) -> ApiResult<()> {
    if is_valid_task_id(id) {
        Ok(())
    } else {
        Err(ApiError::BadRequest("Invalid task ID".to_string()))
    }
}

fn task_not_found() -> ApiError {
    ApiError::NotFound("Task not found".to_string())
}

/// Publishes `{task}` to the task's team board
async fn announce(state: &AppState, task: &Task) {
    let delivered = state
        .hub
        .publish(
            &Room::team_board(&task.team_id),
            TEAM_BOARD_UPDATE,
            json!({ "task": task }),
        )
        .await;
    debug!(task_id = %task.id, team_id = %task.team_id, delivered, "Task update published");
}

/// Tasks of a team, oldest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> ApiResult<Json<Vec<Task>>> {
    let tasks = state.repo().list_tasks_by_team(&team_id).await?;
    Ok(Json(tasks))
}

/// Create a task in `team_id`
///
/// Status defaults to `todo` and priority to `medium`.
///
/// # Errors
///
/// - `400 Bad Request`: Blank title, or unknown status or priority
pub async fn create_task(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(team_id): Path<String>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    req.validate()?;

    let title = non_blank(req.title.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Task title is required".to_string()))?
        .to_string();

    let task = state
        .repo()
        .create_task(NewTask {
            team_id,
            title,
            description: req.description.unwrap_or_default(),
            assigned_to: req.assigned_to.unwrap_or_default(),
            status: req.status.unwrap_or_default(),
            priority: req.priority.unwrap_or_default(),
            due_date: req.due_date.filter(|d| !d.trim().is_empty()),
            created_by: principal.id.clone(),
        })
        .await?;

    info!(task_id = %task.id, team_id = %task.team_id, "Task created");
    announce(&state, &task).await;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Update a task; absent fields are kept
///
/// # Errors
///
/// - `400 Bad Request`: Empty or `undefined` ID
/// - `404 Not Found`: No such task
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TaskPatch>,
) -> ApiResult<Json<Task>> {
    check_task_id(&id)?;

    let task = state.repo().update_task(&id, patch).await?;
    announce(&state, &task).await;

    Ok(Json(task))
}

/// Delete a task
///
/// Emits `teamBoard:update {deletedTaskId}`.
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<OkResponse>> {
    check_task_id(&id)?;

    let repo = state.repo();
    let task = repo.find_task(&id).await?.ok_or_else(task_not_found)?;

    if !repo.delete_task(&id).await? {
        return Err(task_not_found());
    }

    info!(task_id = %task.id, team_id = %task.team_id, "Task deleted");

    state
        .hub
        .publish(
            &Room::team_board(&task.team_id),
            TEAM_BOARD_UPDATE,
            json!({ "deletedTaskId": task.id }),
        )
        .await;

    Ok(Json(OkResponse { ok: true }))
}

/// Append a comment by the caller
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<CommentRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    check_task_id(&id)?;
    req.validate()?;

    let text = non_blank(req.text.as_deref())
        .ok_or_else(|| ApiError::BadRequest("Comment text is required".to_string()))?;

    let task = state
        .repo()
        .add_task_comment(&id, Comment::new(&principal.id, text))
        .await?;
    announce(&state, &task).await;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Attach an uploaded file
///
/// The task is looked up before the upload is read, so nothing is written
/// for a missing task.
///
/// # Errors
///
/// - `400 Bad Request`: No `file` field
/// - `404 Not Found`: No such task
/// - `413 Payload Too Large`: File over 10 MB
pub async fn add_attachment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Task>)> {
    check_task_id(&id)?;

    let repo = state.repo();
    repo.find_task(&id).await?.ok_or_else(task_not_found)?;

    let stored = uploads::save_upload(
        &mut multipart,
        "file",
        &state.config.uploads.dir,
        "attachment",
        uploads::ATTACHMENT_MAX_BYTES,
    )
    .await?;

    let task = repo
        .add_task_attachment(
            &id,
            Attachment {
                id: new_id(),
                name: stored.original_name,
                url: stored.url,
                content_type: stored.content_type,
                size: stored.size,
            },
        )
        .await?;
    announce(&state, &task).await;

    Ok((StatusCode::CREATED, Json(task)))
}
