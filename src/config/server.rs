//! Server-side configuration
//!
//! Read once at startup. A missing or weak signing secret is fatal here,
//! never at request time.

use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;

use crate::error::ConfigError;
use crate::token::SigningSecret;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

pub const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:3001,http://localhost:5173";

pub const SERVICE_NAME: &str = "LetterOn Server";

/// Credential lifetime in hours when none is configured
pub const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

/// Longest accepted credential lifetime (one year)
pub const MAX_TOKEN_LIFETIME_HOURS: i64 = 365 * 24;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub secret: Arc<SigningSecret>,
    pub token_lifetime: Duration,
    pub cors_origins: Vec<String>,
    pub environment: String,
}

impl ServerConfig {
    pub fn new(
        bind: &str,
        secret: Option<&str>,
        token_lifetime_hours: i64,
        cors_origins: &str,
        environment: &str,
    ) -> Result<Self, ConfigError> {
        let bind = bind
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid bind address '{}': {}", bind, e)))?;

        let secret = SigningSecret::new(secret.ok_or(ConfigError::MissingSecret)?)?;

        if !(1..=MAX_TOKEN_LIFETIME_HOURS).contains(&token_lifetime_hours) {
            return Err(ConfigError::Invalid(format!(
                "Token lifetime must be between 1 and {} hours, got {}",
                MAX_TOKEN_LIFETIME_HOURS, token_lifetime_hours
            )));
        }

        Ok(Self {
            bind,
            secret: Arc::new(secret),
            token_lifetime: Duration::hours(token_lifetime_hours),
            cors_origins: parse_origins(cors_origins),
            environment: environment.to_string(),
        })
    }
}

/// Split a comma-separated origin list, dropping blanks
fn parse_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
