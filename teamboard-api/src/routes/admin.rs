/// User administration endpoints
///
/// Mounted under `/api/admin` behind both `require_auth` and
/// `require_admin`, so every handler here runs for an administrator.
///
/// # Endpoints
///
/// - `GET /api/admin/users` - List users, newest first
/// - `POST /api/admin/users` (alias `/users/new`) - Create a user
/// - `GET /api/admin/users/:id` - Get one user
/// - `PATCH /api/admin/users/:id` - Update name, role or active flag
/// - `DELETE /api/admin/users/:id` - Delete a user (not yourself)
/// - `GET /api/admin/stats` - User counts

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::{account_email, non_blank},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{gate::Principal, password},
    models::user::{
        default_display_name, NewUser, User, UserPatch, UserRole, UserStats,
    },
};
use tracing::{info, warn};
use validator::Validate;

/// Administrative view of a user
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserView {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for AdminUserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            last_login: user.last_login,
            created_at: user.created_at,
        }
    }
}

/// Create user request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    /// Trimmed and lowercased before it is checked
    pub email: Option<String>,

    pub password: Option<String>,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    pub role: Option<UserRole>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    pub role: Option<UserRole>,
    pub is_active: Option<bool>,
}

/// Statistics response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: UserStats,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

fn user_not_found() -> ApiError {
    ApiError::NotFound("User not found".to_string())
}

/// List all users
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<AdminUserView>>> {
    let users = state.repo().list_users().await?;
    Ok(Json(users.into_iter().map(AdminUserView::from).collect()))
}

/// Create a user with any role
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password, password under 6
///   characters, or email already registered
pub async fn create_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    ApiJson(req): ApiJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<AdminUserView>)> {
    let (Some(email), Some(password)) = (
        non_blank(req.email.as_deref()),
        req.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let email = account_email(email)?;
    req.validate()?;
    password::validate_new_password(password).map_err(ApiError::BadRequest)?;

    let repo = state.repo();

    if repo.find_user_by_email(&email).await?.is_some() {
        return Err(ApiError::EmailTaken);
    }

    let name = non_blank(req.name.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| default_display_name(&email));
    let password_hash = password::hash_password_blocking(password.to_string()).await?;

    let user = repo
        .create_user(NewUser {
            email,
            password_hash,
            name,
            role: req.role.unwrap_or_default(),
            avatar_url: None,
        })
        .await?;

    info!(admin_id = %admin.id, user_id = %user.id, role = %user.role, "Admin created user");

    Ok((StatusCode::CREATED, Json(AdminUserView::from(user))))
}

/// Get one user
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AdminUserView>> {
    let user = state.repo().find_user(&id).await?.ok_or_else(user_not_found)?;
    Ok(Json(AdminUserView::from(user)))
}

/// Update name, role or active flag
pub async fn update_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> ApiResult<Json<AdminUserView>> {
    req.validate()?;

    let repo = state.repo();
    repo.find_user(&id).await?.ok_or_else(user_not_found)?;

    let user = repo
        .update_user(
            &id,
            UserPatch {
                name: req.name,
                role: req.role,
                is_active: req.is_active,
                ..Default::default()
            },
        )
        .await?;

    info!(admin_id = %admin.id, user_id = %user.id, "Admin updated user");

    Ok(Json(AdminUserView::from(user)))
}

/// Delete a user
///
/// Nothing referencing the user is removed.
///
/// # Errors
///
/// - `400 Bad Request`: Target is the caller
/// - `404 Not Found`: No such user
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let repo = state.repo();
    let user = repo.find_user(&id).await?.ok_or_else(user_not_found)?;

    if user.id == admin.id {
        return Err(ApiError::BadRequest(
            "Cannot delete your own account".to_string(),
        ));
    }

    if !repo.delete_user(&id).await? {
        return Err(user_not_found());
    }

    warn!(admin_id = %admin.id, user_id = %id, "Admin deleted user");

    Ok(Json(DeleteResponse {
        message: "User deleted successfully".to_string(),
    }))
}

/// User counts by role and activity
pub async fn stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let stats = state.repo().user_stats().await?;

    Ok(Json(StatsResponse {
        stats,
        last_updated: Utc::now(),
    }))
}
