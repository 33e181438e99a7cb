/// Error handling for the API server
///
/// Every handler returns [`ApiResult`]; the error half renders as
///
/// ```json
/// { "error": "Invalid credentials", "code": "unauthorized" }
/// ```
///
/// with an extra `details` array for validation failures. Library errors
/// convert through the `From` impls below, so handlers can use `?` on
/// repository, gate and credential calls directly.
///
/// # Example
///
/// ```
/// use teamboard_api::error::{ApiError, ApiResult};
///
/// fn find(id: &str) -> ApiResult<&str> {
///     if id.is_empty() {
///         return Err(ApiError::BadRequest("Invalid task ID".to_string()));
///     }
///     Ok(id)
/// }
///
/// assert!(find("").is_err());
/// ```

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use teamboard_shared::{
    auth::{authorization::AccessError, gate::GateError, jwt::JwtError, password::PasswordError},
    store::StoreError,
};

use crate::routes::uploads::UploadError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Field-level validation failures (400)
    #[error("Validation failed: {} errors", .0.len())]
    ValidationError(Vec<ValidationErrorDetail>),

    /// Duplicate email (400)
    #[error("Email already registered")]
    EmailTaken,

    /// Unauthorized (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Forbidden (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Team is at its member cap (409)
    #[error("Team is full")]
    TeamFull,

    /// Upload over the size ceiling (413)
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Operation unsupported on the serving backing (501)
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Persistent storage unreachable (503)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,

    /// Stable machine-readable code (e.g. "not_found", "team_full")
    pub code: String,

    /// Validation errors, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::ValidationError(_) | ApiError::EmailTaken => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::TeamFull => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::ValidationError(_) => "validation_error",
            ApiError::EmailTaken => "email_taken",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::TeamFull => "team_full",
            ApiError::PayloadTooLarge(_) => "payload_too_large",
            ApiError::InternalError(_) => "internal_error",
            ApiError::NotImplemented(_) => "not_implemented",
            ApiError::ServiceUnavailable(_) => "storage_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let (message, details) = match self {
            ApiError::BadRequest(msg)
            | ApiError::Unauthorized(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::PayloadTooLarge(msg)
            | ApiError::NotImplemented(msg) => (msg, None),
            ApiError::ValidationError(errors) => {
                ("Request validation failed".to_string(), Some(errors))
            }
            ApiError::EmailTaken => ("Email already registered".to_string(), None),
            ApiError::TeamFull => ("Team is full".to_string(), None),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                ("Server error".to_string(), None)
            }
            ApiError::ServiceUnavailable(msg) => {
                tracing::warn!("Storage unavailable: {}", msg);
                ("Storage temporarily unavailable".to_string(), None)
            }
        };

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

/// Converts `validator` failures into field details
impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let errors = err
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |error| ValidationErrorDetail {
                    field: field.to_string(),
                    message: error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| "Validation failed".to_string()),
                })
            })
            .collect();
        ApiError::ValidationError(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity } => {
                let mut chars = entity.chars();
                let entity: String = match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                };
                ApiError::NotFound(format!("{} not found", entity))
            }
            StoreError::Conflict { .. } => ApiError::EmailTaken,
            StoreError::Unavailable(msg) => ApiError::ServiceUnavailable(msg),
            StoreError::Internal(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<GateError> for ApiError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::MissingToken | GateError::InvalidToken | GateError::UserNotFound => {
                ApiError::Unauthorized(err.to_string())
            }
            GateError::Forbidden => ApiError::Forbidden(err.to_string()),
            GateError::Storage(err) => err.into(),
        }
    }
}

impl From<AccessError> for ApiError {
    fn from(err: AccessError) -> Self {
        ApiError::Forbidden(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

/// Only token issuing reaches handlers; validation failures go through the gate
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        ApiError::InternalError(format!("Token operation failed: {}", err))
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::MissingFile => ApiError::BadRequest(err.to_string()),
            UploadError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            UploadError::Malformed(_) => ApiError::BadRequest(err.to_string()),
            UploadError::Io(e) => ApiError::InternalError(format!("Upload write failed: {}", e)),
        }
    }
}
