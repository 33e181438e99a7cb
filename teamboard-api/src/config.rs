/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `JWT_SECRET`: Secret key for token signing (required, at least 32 chars)
/// - `DATABASE_URL`: PostgreSQL connection string (optional; without it the
///   server runs on volatile storage only)
/// - `STORAGE_MODE`: `auto` (default) or `memory`
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `DATABASE_HEALTH_INTERVAL_SECS`: Reachability probe interval (default: 5)
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3001)
/// - `CORS_ORIGINS`: Comma-separated origins, `*` for any (default: `*`)
/// - `PRODUCTION`: Enables HSTS (default: false)
/// - `UPLOAD_DIR`: Where avatars and attachments are written
///   (default: `public/uploads`)
/// - `ALLOW_ADMIN_REGISTRATION`: Lets public registration request the admin
///   role (default: false)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use teamboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use std::{env, path::PathBuf, str::FromStr};

/// Minimum accepted length of `JWT_SECRET`
pub const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub uploads: UploadConfig,

    /// Whether `POST /api/auth/register` may create administrators
    pub allow_admin_registration: bool,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` means any
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

/// How storage is selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// Use the database whenever it is reachable, volatile storage otherwise
    Auto,

    /// Never touch the database
    Memory,
}

impl FromStr for StorageMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(StorageMode::Auto),
            "memory" => Ok(StorageMode::Memory),
            other => anyhow::bail!("STORAGE_MODE must be 'auto' or 'memory', got '{}'", other),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL, if any
    pub url: Option<String>,

    pub mode: StorageMode,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Seconds between reachability probes
    pub health_interval_secs: u64,
}

impl DatabaseConfig {
    /// The URL to connect to, or `None` when running volatile-only
    pub fn persistent_url(&self) -> Option<&str> {
        match self.mode {
            StorageMode::Memory => None,
            StorageMode::Auto => self.url.as_deref().filter(|url| !url.trim().is_empty()),
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for token signing
    ///
    /// Generate with: `openssl rand -hex 32`
    pub secret: String,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory served under `/uploads`
    pub dir: PathBuf,
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e))
}

fn parse_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `JWT_SECRET` is missing or shorter than 32 characters
    /// - A numeric variable or `STORAGE_MODE` has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        validate_secret(&jwt_secret)?;

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_var("API_PORT", "3001")?,
                cors_origins,
                production: parse_flag("PRODUCTION"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").ok(),
                mode: parse_var("STORAGE_MODE", "auto")?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "10")?,
                health_interval_secs: parse_var("DATABASE_HEALTH_INTERVAL_SECS", "5")?,
            },
            jwt: JwtConfig { secret: jwt_secret },
            uploads: UploadConfig {
                dir: env::var("UPLOAD_DIR")
                    .unwrap_or_else(|_| "public/uploads".to_string())
                    .into(),
            },
            allow_admin_registration: parse_flag("ALLOW_ADMIN_REGISTRATION"),
        })
    }

    /// Volatile-only configuration with the given secret, for tests and tools
    pub fn for_memory(secret: impl Into<String>, upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: None,
                mode: StorageMode::Memory,
                max_connections: 10,
                health_interval_secs: 5,
            },
            jwt: JwtConfig {
                secret: secret.into(),
            },
            uploads: UploadConfig {
                dir: upload_dir.into(),
            },
            allow_admin_registration: false,
        }
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Rejects secrets that are too short to sign tokens with
pub fn validate_secret(secret: &str) -> anyhow::Result<()> {
    if secret.len() < MIN_SECRET_LEN {
        anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LEN);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_address() {
        let mut config = Config::for_memory("test-secret-key-at-least-32-bytes-long", "/tmp");
        config.api.port = 3001;

        assert_eq!(config.bind_address(), "127.0.0.1:3001");
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(validate_secret("short").is_err());
        assert!(validate_secret(&"x".repeat(32)).is_ok());
    }

    #[test]
    fn test_storage_mode_parsing() {
        assert_eq!("auto".parse::<StorageMode>().unwrap(), StorageMode::Auto);
        assert_eq!(" Memory ".parse::<StorageMode>().unwrap(), StorageMode::Memory);
        assert!("mongo".parse::<StorageMode>().is_err());
    }

    #[test]
    fn test_memory_mode_ignores_url() {
        let mut config = Config::for_memory("test-secret-key-at-least-32-bytes-long", "/tmp");
        config.database.url = Some("postgresql://localhost/teamboard".to_string());
        assert_eq!(config.database.persistent_url(), None);

        config.database.mode = StorageMode::Auto;
        assert_eq!(
            config.database.persistent_url(),
            Some("postgresql://localhost/teamboard")
        );

        config.database.url = Some("  ".to_string());
        assert_eq!(config.database.persistent_url(), None);
    }
}
