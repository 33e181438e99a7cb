/// Board endpoints
///
/// A board is readable and writable by its owner and its members. Only the
/// owner may share it, and sharing needs the persistent backing.
///
/// # Endpoints
///
/// - `GET /api/boards` - Boards the caller owns or is a member of
/// - `POST /api/boards` - Create a board
/// - `GET /api/boards/:id` - Get a board
/// - `PUT /api/boards/:id` - Update title and data
/// - `POST /api/boards/:id/share` - Add a member by email

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::non_blank,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use teamboard_shared::{
    auth::{authorization, gate::Principal},
    models::{
        board::{Board, BoardPatch, NewBoard, DEFAULT_BOARD_TITLE},
        user::normalize_email,
    },
    realtime::events::{Room, BOARD_SHARED, TEAM_BOARD_UPDATE},
    store::Backing,
};
use tracing::{debug, info};
use validator::Validate;

/// Create board request
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateBoardRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    pub data: Option<JsonValue>,
}

/// Update board request; absent fields are kept
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBoardRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    pub data: Option<JsonValue>,
}

/// Share request
#[derive(Debug, Deserialize)]
pub struct ShareBoardRequest {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

fn board_not_found() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

/// Loads a board the caller may access
async fn accessible_board(state: &AppState, id: &str, principal: &Principal) -> ApiResult<Board> {
    let board = state
        .repo()
        .find_board(id)
        .await?
        .ok_or_else(board_not_found)?;

    authorization::ensure_board_access(&board, principal)?;
    Ok(board)
}

/// List the caller's boards
pub async fn list_boards(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<Board>>> {
    let boards = state.repo().list_boards_for(&principal.id).await?;
    Ok(Json(boards))
}

/// Create a board owned by the caller
///
/// `title` defaults to "Untitled Board" and `data` to `{}`.
pub async fn create_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<CreateBoardRequest>,
) -> ApiResult<(StatusCode, Json<Board>)> {
    req.validate()?;

    let board = state
        .repo()
        .create_board(NewBoard {
            title: non_blank(req.title.as_deref())
                .unwrap_or(DEFAULT_BOARD_TITLE)
                .to_string(),
            owner: principal.id.clone(),
            data: req.data.unwrap_or_else(|| json!({})),
        })
        .await?;

    info!(board_id = %board.id, owner = %principal.id, "Board created");

    Ok((StatusCode::CREATED, Json(board)))
}

/// Get a board
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither owner nor member
/// - `404 Not Found`: No such board
pub async fn get_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<Board>> {
    let board = accessible_board(&state, &id, &principal).await?;
    Ok(Json(board))
}

/// Update title and data
///
/// Emits `teamBoard:update {id, data, title}` to `teamBoard:<id>`.
pub async fn update_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateBoardRequest>,
) -> ApiResult<Json<Board>> {
    req.validate()?;
    accessible_board(&state, &id, &principal).await?;

    let board = state
        .repo()
        .update_board(
            &id,
            BoardPatch {
                title: req.title,
                data: req.data,
            },
        )
        .await?;

    let delivered = state
        .hub
        .publish(
            &Room::team_board(&board.id),
            TEAM_BOARD_UPDATE,
            json!({ "id": board.id, "data": board.data, "title": board.title }),
        )
        .await;
    debug!(board_id = %board.id, delivered, "Board update published");

    Ok(Json(board))
}

/// Share a board with another user by email
///
/// Emits `board:shared {boardId, title}` to `user:<member id>`.
///
/// # Errors
///
/// - `501 Not Implemented`: Serving from volatile storage
/// - `403 Forbidden`: Caller is not the owner
/// - `404 Not Found`: No such board or user
pub async fn share_board(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<ShareBoardRequest>,
) -> ApiResult<Json<OkResponse>> {
    if state.storage.backing() == Backing::Volatile {
        return Err(ApiError::NotImplemented(
            "Sharing is not implemented for in-memory mode.".to_string(),
        ));
    }

    let repo = state.repo();
    let board = repo.find_board(&id).await?.ok_or_else(board_not_found)?;
    authorization::ensure_board_owner(&board, &principal)?;

    let user = match non_blank(req.email.as_deref()) {
        Some(email) => repo.find_user_by_email(&normalize_email(email)).await?,
        None => None,
    }
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let board = repo.add_board_member(&board.id, &user.id).await?;

    info!(board_id = %board.id, member = %user.id, "Board shared");

    state
        .hub
        .publish(
            &Room::user(&user.id),
            BOARD_SHARED,
            json!({ "boardId": board.id, "title": board.title }),
        )
        .await;

    Ok(Json(OkResponse { ok: true }))
}
