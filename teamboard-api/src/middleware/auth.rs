/// Gate middleware
///
/// [`require_auth`] resolves the bearer token through
/// [`teamboard_shared::auth::gate::authenticate`] against the backing that is
/// serving this request, then inserts the [`Principal`] into request
/// extensions. Handlers pick it up with `Extension<Principal>`.
/// [`require_admin`] must be layered inside `require_auth`.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    Extension,
};
use teamboard_shared::auth::gate::{self, Principal};

use crate::{app::AppState, error::ApiError};

/// Authenticates the request or rejects it with 401
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let principal = gate::authenticate(state.repo(), state.jwt_secret(), header).await?;
    tracing::debug!(user_id = %principal.id, role = %principal.role, "Request authenticated");

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Rejects non-administrators with 403
pub async fn require_admin(
    Extension(principal): Extension<Principal>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    gate::require_admin(&principal)?;
    Ok(next.run(req).await)
}
