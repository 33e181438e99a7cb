/// Credential store and authorization
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: signed session tokens (HS256, 7 days)
/// - [`gate`]: bearer token to [`gate::Principal`] resolution
/// - [`authorization`]: per-resource access rules
///
/// # Example
///
/// ```
/// use teamboard_shared::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("pw123456").unwrap();
/// assert!(verify_password("pw123456", &hash).unwrap());
/// assert!(!verify_password("pw123457", &hash).unwrap());
/// ```

pub mod authorization;
pub mod gate;
pub mod jwt;
pub mod password;
