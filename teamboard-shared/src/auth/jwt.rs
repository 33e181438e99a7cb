/// Session tokens
///
/// Sessions are stateless HS256 JWTs carrying the user's identity and role.
/// There is no server-side revocation; a token is valid until it expires and
/// logging out is purely a client concern.
///
/// # Claims
///
/// - `sub`: user ID
/// - `email`, `name`, `role`, `avatarUrl`: identity snapshot at issue time
/// - `iss`: always `"teamboard"`
/// - `iat` / `exp`: issue and expiry (Unix seconds), 7 days apart by default
///
/// A token is rejected when its signature does not verify or when the current
/// time is at or past `exp`.
///
/// # Example
///
/// ```
/// use teamboard_shared::auth::jwt::{create_token, validate_token, Claims};
/// use teamboard_shared::models::user::UserRole;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let secret = "a-secret-that-is-at-least-32-bytes-long";
/// let claims = Claims::new("user-1", "a@example.com", "a", UserRole::User, None);
/// let token = create_token(&claims, secret)?;
///
/// let validated = validate_token(&token, secret)?;
/// assert_eq!(validated.sub, "user-1");
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::models::user::{User, UserRole};

/// Token issuer
pub const ISSUER: &str = "teamboard";

/// Session lifetime
pub const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer")]
    InvalidIssuer,

    #[error("Invalid token: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: String,

    pub email: String,
    pub name: String,
    pub role: UserRole,

    #[serde(rename = "avatarUrl", default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Issuer - always "teamboard"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Creates claims with the default 7 day lifetime
    pub fn new(
        user_id: &str,
        email: &str,
        name: &str,
        role: UserRole,
        avatar_url: Option<String>,
    ) -> Self {
        Self::with_expiration(
            user_id,
            email,
            name,
            role,
            avatar_url,
            Duration::days(TOKEN_TTL_DAYS),
        )
    }

    /// Creates claims with a custom lifetime; a negative duration yields an
    /// already-expired token
    pub fn with_expiration(
        user_id: &str,
        email: &str,
        name: &str,
        role: UserRole,
        avatar_url: Option<String>,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            name: name.to_string(),
            role,
            avatar_url,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: (now + expires_in).timestamp(),
        }
    }

    /// Snapshot of a user's current identity
    pub fn for_user(user: &User) -> Self {
        Self::new(
            &user.id,
            &user.email,
            &user.name,
            user.role,
            user.avatar_url.clone(),
        )
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Issues a fresh session token for a user
pub fn issue_for_user(user: &User, secret: &str) -> Result<String, JwtError> {
    create_token(&Claims::for_user(user), secret)
}

/// Verifies signature, issuer and expiry and returns the claims
///
/// # Errors
///
/// - `JwtError::Expired` if `now >= exp`
/// - `JwtError::InvalidIssuer` if the token was not issued by this service
/// - `JwtError::Invalid` for bad signatures and malformed tokens
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.validate_exp = true;
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::Invalid(e.to_string()),
    })?;

    // The library only rejects exp < now; expiry is inclusive here.
    if token_data.claims.is_expired() {
        return Err(JwtError::Expired);
    }

    Ok(token_data.claims)
}
