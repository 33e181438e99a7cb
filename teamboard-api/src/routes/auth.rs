/// Authentication endpoints
///
/// This module provides the public account endpoints:
/// - Registration
/// - Login
/// - Password reset
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create an account
/// - `POST /api/auth/login` - Verify credentials and get a session token
/// - `POST /api/auth/reset-password` - Overwrite a password by email
///
/// Emails are trimmed and lowercased before every lookup, so
/// `Alice@Example.com` and `alice@example.com` name the same account.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::ApiJson,
    routes::{account_email, non_blank},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{jwt, password},
    models::user::{default_display_name, normalize_email, NewUser, User, UserPatch, UserRole},
};
use tracing::{info, warn};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Trimmed and lowercased before it is checked
    pub email: Option<String>,

    pub password: Option<String>,

    /// Display name; defaults to the local part of the email
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    /// Requested role; `admin` needs `ALLOW_ADMIN_REGISTRATION`
    pub role: Option<UserRole>,
}

/// Login request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,

    /// Which login section the client used (`user` or `admin`)
    pub user_type: Option<String>,
}

/// Password reset request
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Public identity returned by register and login
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl AccountSummary {
    fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
        }
    }
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub ok: bool,
    pub user: AccountSummary,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub ok: bool,

    /// Session token (7 days)
    pub token: String,

    pub user: AccountSummary,
}

/// Password reset response
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetPasswordResponse {
    pub ok: bool,
    pub message: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/register
/// Content-Type: application/json
///
/// {
///   "email": "alice@example.com",
///   "password": "pw123456",
///   "name": "Alice"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// { "ok": true, "user": { "id": "...", "email": "alice@example.com", "name": "Alice", "role": "user" } }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password, or invalid email
/// - `400 Bad Request` (`email_taken`): Email already registered
/// - `403 Forbidden`: Admin role requested while admin registration is off
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
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

    let role = req.role.unwrap_or_default();
    if role.is_admin() && !state.config.allow_admin_registration {
        warn!(email = %email, "Rejected self-registration as admin");
        return Err(ApiError::Forbidden(
            "Admin registration is disabled.".to_string(),
        ));
    }

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
            role,
            avatar_url: None,
        })
        .await?;

    info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            ok: true,
            user: AccountSummary::from_user(&user),
        }),
    ))
}

/// Login with email and password
///
/// Admins may sign in through either login section; everyone else must use
/// the section matching their role when `userType` is sent.
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/login
/// Content-Type: application/json
///
/// { "email": "alice@example.com", "password": "pw123456", "userType": "user" }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Role does not match `userType`
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let (Some(email), Some(password)) = (
        non_blank(req.email.as_deref()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Email and password are required".to_string(),
        ));
    };

    let repo = state.repo();
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = repo
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password_blocking(password, user.password_hash.clone()).await? {
        info!(user_id = %user.id, "Login failed: wrong password");
        return Err(invalid());
    }

    if let Some(user_type) = non_blank(req.user_type.as_deref()) {
        if !user.role.is_admin() && user_type != user.role.as_str() {
            return Err(ApiError::Forbidden(format!(
                "This account is registered as {role}. Please use the {role} login section.",
                role = user.role
            )));
        }
    }

    let user = repo
        .update_user(
            &user.id,
            UserPatch {
                last_login: Some(chrono::Utc::now()),
                ..Default::default()
            },
        )
        .await?;

    let token = jwt::issue_for_user(&user, state.jwt_secret())?;

    info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        ok: true,
        token,
        user: AccountSummary::from_user(&user),
    }))
}

/// Reset a password by email
///
/// Demonstration flow: there is no emailed confirmation step, knowing the
/// address is enough.
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password
/// - `404 Not Found`: No account with that email
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> ApiResult<Json<ResetPasswordResponse>> {
    let (Some(email), Some(password)) = (
        non_blank(req.email.as_deref()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::BadRequest(
            "Email and new password are required.".to_string(),
        ));
    };

    let repo = state.repo();
    let user = repo
        .find_user_by_email(&normalize_email(email))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found.".to_string()))?;

    let password_hash = password::hash_password_blocking(password).await?;
    repo.update_user(
        &user.id,
        UserPatch {
            password_hash: Some(password_hash),
            ..Default::default()
        },
    )
    .await?;

    warn!(user_id = %user.id, "Password reset without confirmation");

    Ok(Json(ResetPasswordResponse {
        ok: true,
        message: "Password has been reset successfully.".to_string(),
    }))
}
