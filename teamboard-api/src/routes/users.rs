/// User directory and self-service profile endpoints
///
/// # Endpoints
///
/// - `GET /api/users` - Directory of all users (for assigning work)
/// - `GET /api/users/me` - Caller's profile
/// - `PATCH /api/users/me` - Update name (anyone) or role (admins only)
/// - `POST /api/users/me/avatar` - Upload an avatar (multipart field `avatar`)
/// - `PATCH /api/users/me/password` - Change password
///
/// Profile writes return a fresh token because the token carries name, role
/// and avatar.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::{non_blank, uploads},
};
use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{gate::Principal, jwt, password},
    models::user::{User, UserPatch, UserRole},
};
use tracing::info;

/// Directory entry
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
}

/// The caller's own profile
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
}

impl From<&User> for Profile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            role: user.role,
            is_active: user.is_active,
            last_login: user.last_login,
        }
    }
}

/// Profile update request
///
/// `role` is a plain string so unknown values are ignored rather than
/// rejected.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub role: Option<String>,
}

/// Profile update response
#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileUpdateResponse {
    pub user: Profile,
    pub token: String,
}

/// Avatar upload response
#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarResponse {
    pub ok: bool,
    pub user: Profile,
    pub token: String,
}

/// Password change request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn load_self(state: &AppState, principal: &Principal) -> ApiResult<User> {
    state
        .repo()
        .find_user(&principal.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))
}

/// List all users
pub async fn list_directory(State(state): State<AppState>) -> ApiResult<Json<Vec<DirectoryEntry>>> {
    let users = state.repo().list_users().await?;

    Ok(Json(
        users
            .into_iter()
            .map(|u| DirectoryEntry {
                id: u.id,
                name: u.name,
                email: u.email,
                avatar_url: u.avatar_url,
                role: u.role,
            })
            .collect(),
    ))
}

/// Get the caller's profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Profile>> {
    let user = load_self(&state, &principal).await?;
    Ok(Json(Profile::from(&user)))
}

/// Update the caller's profile
///
/// A non-admin sending `{"role": "admin"}` gets a 200 with the role
/// unchanged.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileUpdateResponse>> {
    let mut patch = UserPatch {
        name: non_blank(req.name.as_deref()).map(str::to_string),
        ..Default::default()
    };

    if principal.is_admin() {
        patch.role = req
            .role
            .as_deref()
            .and_then(|r| r.parse::<UserRole>().ok());
    }

    let user = state.repo().update_user(&principal.id, patch).await?;
    let token = jwt::issue_for_user(&user, state.jwt_secret())?;

    info!(user_id = %user.id, role = %user.role, "Profile updated");

    Ok(Json(ProfileUpdateResponse {
        user: Profile::from(&user),
        token,
    }))
}

/// Upload an avatar image
///
/// # Errors
///
/// - `400 Bad Request`: No `avatar` field in the form
/// - `413 Payload Too Large`: File over 5 MB
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    mut multipart: Multipart,
) -> ApiResult<Json<AvatarResponse>> {
    let stored = uploads::save_upload(
        &mut multipart,
        "avatar",
        &state.config.uploads.dir,
        "avatar",
        uploads::AVATAR_MAX_BYTES,
    )
    .await?;

    let user = state
        .repo()
        .update_user(
            &principal.id,
            UserPatch {
                avatar_url: Some(stored.url),
                ..Default::default()
            },
        )
        .await?;
    let token = jwt::issue_for_user(&user, state.jwt_secret())?;

    Ok(Json(AvatarResponse {
        ok: true,
        user: Profile::from(&user),
        token,
    }))
}

/// Change the caller's password
///
/// # Errors
///
/// - `400 Bad Request`: A field is missing, the new password is shorter than
///   6 characters, or the current password does not verify
pub async fn change_password(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let (Some(current), Some(new)) = (
        req.current_password.filter(|p| !p.is_empty()),
        req.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Current and new passwords are required.".to_string(),
        ));
    };

    password::validate_new_password(&new).map_err(ApiError::BadRequest)?;

    let user = load_self(&state, &principal).await?;

    if !password::verify_password_blocking(current, user.password_hash.clone()).await? {
        return Err(ApiError::BadRequest(
            "Incorrect current password.".to_string(),
        ));
    }

    let password_hash = password::hash_password_blocking(new).await?;
    state
        .repo()
        .update_user(
            &user.id,
            UserPatch {
                password_hash: Some(password_hash),
                ..Default::default()
            },
        )
        .await?;

    info!(user_id = %user.id, "Password changed");

    Ok(Json(MessageResponse {
        message: "Password changed successfully.".to_string(),
    }))
}
