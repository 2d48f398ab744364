//! Configuration management for LetterOn

pub mod server;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

pub use server::ServerConfig;

/// API host used when none is configured
pub const DEFAULT_API_HOST: &str = "http://localhost:8000";

/// Upper bound for `preferences.warn_before_expiry_minutes` (one week)
pub const MAX_WARN_BEFORE_EXPIRY_MINUTES: i64 = 7 * 24 * 60;

/// Client configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LetterOn API base URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,
}

/// User preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Keep the credential across restarts
    #[serde(default = "default_remember_me")]
    pub remember_me: bool,

    /// Warn when the credential expires within this many minutes
    #[serde(default = "default_warn_before_expiry_minutes")]
    pub warn_before_expiry_minutes: i64,
}

fn default_remember_me() -> bool {
    true
}

fn default_warn_before_expiry_minutes() -> i64 {
    10
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            remember_me: default_remember_me(),
            warn_before_expiry_minutes: default_warn_before_expiry_minutes(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".letteron").join("config.yaml"))
    }

    /// Resolve an optional override to a concrete config path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to the default or overridden path
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// API base URL, honoring a runtime override first
    pub fn api_base_url(&self, host_override: Option<&str>) -> String {
        host_override
            .or(self.api_host.as_deref())
            .unwrap_or(DEFAULT_API_HOST)
            .trim_end_matches('/')
            .to_string()
    }

    pub fn warn_before_expiry(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.preferences.warn_before_expiry_minutes)
    }

    fn validate(&self) -> Result<()> {
        let minutes = self.preferences.warn_before_expiry_minutes;
        if !(0..=MAX_WARN_BEFORE_EXPIRY_MINUTES).contains(&minutes) {
            return Err(ConfigError::Invalid(format!(
                "preferences.warn_before_expiry_minutes must be between 0 and {}",
                MAX_WARN_BEFORE_EXPIRY_MINUTES
            ))
            .into());
        }
        Ok(())
    }
}
