/// Health check endpoint
///
/// Reports whether the process is up and which backing is serving requests.
/// It never fails: an unreachable database only flips `mongo` to `false`.
///
/// # Endpoint
///
/// ```text
/// GET /api/health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "ok": true,
///   "mongo": false,
///   "storage": "volatile",
///   "version": "0.1.0"
/// }
/// ```
///
/// `mongo` keeps the field name existing clients poll for; it is `true`
/// exactly when the persistent backing is serving.

use crate::app::AppState;
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,

    /// Whether the persistent backing is serving
    pub mongo: bool,

    /// `persistent` or `volatile`
    pub storage: String,

    /// Application version
    pub version: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        mongo: state.storage.persistent_serving(),
        storage: state.storage.backing().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
