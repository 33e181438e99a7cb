/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Liveness probe
/// - `auth`: Registration, login and password reset
/// - `users`: Directory and the caller's own profile
/// - `boards`: Boards and sharing
/// - `messages`: Direct messages and unread counts
/// - `teams`: Teams and joining
/// - `tasks`: Team tasks, comments and attachments
/// - `admin`: User administration
/// - `socket`: Realtime WebSocket endpoint
/// - `uploads`: Multipart file storage shared by users and tasks

pub mod admin;
pub mod auth;
pub mod boards;
pub mod health;
pub mod messages;
pub mod socket;
pub mod tasks;
pub mod teams;
pub mod uploads;
pub mod users;

use crate::error::{ApiError, ApiResult, ValidationErrorDetail};
use teamboard_shared::models::user::normalize_email;
use validator::ValidateEmail;

/// Trimmed value of an optional text field, `None` when absent or blank
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Normalized account email, rejected when it is not an address
pub(crate) fn account_email(raw: &str) -> ApiResult<String> {
    let email = normalize_email(raw);
    if !email.validate_email() {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "email".to_string(),
            message: "Invalid email format".to_string(),
        }]));
    }
    Ok(email)
}
