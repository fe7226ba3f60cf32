use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{auth::TokenSettings, errors::Error, models::Page};

pub const DEFAULT_CONFIG_FILE: &str = "chorus.toml";
pub const MIN_SECRET_LEN: usize = 32;
/// Upper bound for either token lifetime: ten years.
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 86_400;

/// Configuration stored in `chorus.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChorusConfig {
    #[serde(default)]
    pub redis: RedisSettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub listing: ListingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    #[serde(default = "default_redis_url")]
    pub url: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for RedisSettings {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            prefix: default_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "${REDIS_URL}".to_string()
}

fn default_prefix() -> String {
    "chorus".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "default_secret")]
    pub secret: String,
    #[serde(default = "default_access_ttl_secs")]
    pub access_ttl_secs: i64,
    #[serde(default = "default_refresh_ttl_secs")]
    pub refresh_ttl_secs: i64,
    #[serde(default = "default_rotate_refresh")]
    pub rotate_refresh: bool,
    #[serde(default = "default_password_iterations")]
    pub password_iterations: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            access_ttl_secs: default_access_ttl_secs(),
            refresh_ttl_secs: default_refresh_ttl_secs(),
            rotate_refresh: default_rotate_refresh(),
            password_iterations: default_password_iterations(),
        }
    }
}

fn default_secret() -> String {
    "${CHORUS_SECRET}".to_string()
}

fn default_access_ttl_secs() -> i64 {
    300
}

fn default_refresh_ttl_secs() -> i64 {
    86_400
}

fn default_rotate_refresh() -> bool {
    true
}

fn default_password_iterations() -> u32 {
    100_000
}

impl AuthSettings {
    /// Token lifetimes must lie in `1..=MAX_TOKEN_TTL_SECS`.
    pub fn token_settings(&self) -> Result<TokenSettings, Error> {
        Ok(TokenSettings {
            access_ttl: ttl("auth.access_ttl_secs", self.access_ttl_secs)?,
            refresh_ttl: ttl("auth.refresh_ttl_secs", self.refresh_ttl_secs)?,
            rotate_refresh: self.rotate_refresh,
        })
    }

    /// Signing secret with environment variables expanded.
    pub fn secret(&self) -> Result<String, Error> {
        let secret = expand_env(&self.secret)?;
        if secret.len() < MIN_SECRET_LEN {
            return Err(Error::Config {
                message: format!("auth.secret must be at least {MIN_SECRET_LEN} bytes").into(),
            });
        }
        Ok(secret)
    }
}

fn ttl(field: &str, secs: i64) -> Result<Duration, Error> {
    if !(1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
        return Err(Error::Config {
            message: format!("{field} must be between 1 and {MAX_TOKEN_TTL_SECS} seconds, got {secs}").into(),
        });
    }
    Duration::try_seconds(secs).ok_or_else(|| Error::Config {
        message: format!("{field} is out of range").into(),
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ListingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for ListingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize {
    20
}

fn default_max_limit() -> usize {
    100
}

impl ListingSettings {
    /// Resolves a requested page into `(offset, limit)` with the limit clamped to `[1, max_limit]`.
    pub fn window(&self, page: &Page) -> (usize, usize) {
        let max = self.max_limit.max(1);
        let limit = page.limit.unwrap_or(self.default_limit).clamp(1, max);
        (page.offset, limit)
    }
}

impl ChorusConfig {
    /// Loads `path`, or `chorus.toml` from the working directory when no path is given.
    /// A missing default file yields the defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !path.exists() {
            if explicit {
                return Err(Error::Config {
                    message: format!("config file {} does not exist", path.display()).into(),
                });
            }
            log::warn!("{} not found, using default configuration", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|err| Error::Config {
            message: format!("failed to read {}: {err}", path.display()).into(),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, Error> {
        toml::from_str(content).map_err(|err| Error::Config {
            message: format!("failed to parse config: {err}").into(),
        })
    }

    /// Get the Redis URL, expanding environment variables.
    pub fn redis_url(&self) -> Result<String, Error> {
        expand_env(&self.redis.url)
    }
}

/// Expands a value of the exact form `${NAME}` from the environment.
pub fn expand_env(value: &str) -> Result<String, Error> {
    if let Some(var_name) = value.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
        std::env::var(var_name).map_err(|_| Error::Config {
            message: format!("environment variable {var_name} not set").into(),
        })
    } else {
        Ok(value.to_string())
    }
}
