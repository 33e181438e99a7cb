/// Middleware modules for the API server
///
/// - `auth`: bearer gate and admin check
/// - `security`: security response headers

pub mod auth;
pub mod security;
