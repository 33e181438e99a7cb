/// Request extractors
///
/// [`ApiJson`] behaves like `axum::Json` but rejects malformed bodies with the
/// standard `{error, code}` shape instead of axum's plain-text rejection.

use axum::extract::FromRequest;

use crate::error::ApiError;

#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);
