/// Bearer-token gate
///
/// Resolves an `Authorization` header value to a [`Principal`] by verifying
/// the session token and then loading the subject from the active backing.
/// The HTTP layer wraps [`authenticate`] in a middleware and inserts the
/// principal into request extensions.
///
/// ```text
/// no header / no Bearer  -> MissingToken  (401)
/// bad signature / expiry -> InvalidToken  (401)
/// subject not stored     -> UserNotFound  (401)
/// otherwise              -> Principal
/// ```
///
/// # Example
///
/// ```
/// use teamboard_shared::auth::gate::{authenticate, GateError};
/// use teamboard_shared::store::MemoryStore;
///
/// # async fn example() {
/// let store = MemoryStore::new();
/// let err = authenticate(&store, "secret", None).await.unwrap_err();
/// assert!(matches!(err, GateError::MissingToken));
/// # }
/// ```

use serde::Serialize;

use super::jwt::validate_token;
use crate::models::user::{User, UserRole};
use crate::store::{Repository, StoreError};

/// The authenticated identity of a request
///
/// Built from the stored user rather than the token claims, so a role change
/// takes effect on the next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    pub avatar_url: Option<String>,
}

impl Principal {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            avatar_url: user.avatar_url.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Gate failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateError {
    #[error("Authentication token required.")]
    MissingToken,

    #[error("Invalid or expired token.")]
    InvalidToken,

    #[error("User not found.")]
    UserNotFound,

    #[error("Access denied. Admin privileges required.")]
    Forbidden,

    /// The subject lookup itself failed
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Extracts the token from a `Bearer <token>` header value
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves a header value to a principal
///
/// # Errors
///
/// See the module table; storage failures are passed through as
/// [`GateError::Storage`].
pub async fn authenticate(
    repo: &dyn Repository,
    secret: &str,
    header: Option<&str>,
) -> Result<Principal, GateError> {
    let token = bearer_token(header).ok_or(GateError::MissingToken)?;

    let claims = validate_token(token, secret).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session token");
        GateError::InvalidToken
    })?;

    let user = repo
        .find_user(&claims.sub)
        .await?
        .ok_or(GateError::UserNotFound)?;

    Ok(Principal::from_user(&user))
}

/// Requires an administrator
pub fn require_admin(principal: &Principal) -> Result<(), GateError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(GateError::Forbidden)
    }
}
