use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Placeholder JWT secrets that MUST NOT be used in production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("DOJO_ENV must be 'dev' or 'prod', got '{0}'")]
    BadEnvironment(String),
    #[error("DOJO_JWT_SECRET is unset or still a placeholder; set a real secret for prod")]
    PlaceholderSecret,
    #[error("DOJO_ALLOWED_ORIGINS must be set in prod")]
    MissingOrigins,
    #[error("invalid listen address {0}")]
    BadAddress(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    pub media_dir: PathBuf,
    /// Empty means any origin (dev only).
    pub allowed_origins: Vec<String>,
    pub staff_users: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let list = |key: &str| -> Vec<String> {
            lookup(key)
                .unwrap_or_default()
                .split_whitespace()
                .map(str::to_string)
                .collect()
        };

        let environment = match var("DOJO_ENV", "dev").to_ascii_lowercase().as_str() {
            "dev" => Environment::Dev,
            "prod" => Environment::Prod,
            other => return Err(ConfigError::BadEnvironment(other.to_string())),
        };

        let jwt_secret = var("DOJO_JWT_SECRET", "");
        let jwt_secret = match environment {
            Environment::Prod if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) => {
                return Err(ConfigError::PlaceholderSecret);
            }
            Environment::Dev if jwt_secret.is_empty() => DEV_SECRET.to_string(),
            _ => jwt_secret,
        };

        let allowed_origins = list("DOJO_ALLOWED_ORIGINS");
        if environment == Environment::Prod && allowed_origins.is_empty() {
            return Err(ConfigError::MissingOrigins);
        }

        let host = var("DOJO_HOST", "0.0.0.0");
        let port = var("DOJO_PORT", "3000");
        let addr = format!("{}:{}", host, port);
        let addr: SocketAddr = addr.parse().map_err(|_| ConfigError::BadAddress(addr))?;

        Ok(Self {
            environment,
            jwt_secret,
            db_path: var("DOJO_DB_PATH", "dojo.db").into(),
            addr,
            media_dir: var("DOJO_MEDIA_DIR", "./media").into(),
            allowed_origins,
            staff_users: list("DOJO_STAFF_USERS"),
        })
    }
}
