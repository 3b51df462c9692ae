//! Client configuration.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// File name the session record is stored under.
pub const SESSION_STORAGE_NAME: &str = "nuclick-session.json";

/// UTC hour of the daily reset.
pub const DEFAULT_RESET_HOUR_UTC: u32 = 14;

/// Cooldown applied when the server cannot be asked (60 seconds).
pub const DEFAULT_COOLDOWN_SECS: u32 = 60;

/// What to do when the authoritative cooldown cannot be fetched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CooldownFallback {
    /// Apply a fixed, non-zero cooldown so the player is never left
    /// unconstrained.
    UseDefault { seconds: u32 },
    /// Return the failure and leave the deadline untouched.
    Propagate,
}

impl Default for CooldownFallback {
    fn default() -> Self {
        Self::UseDefault {
            seconds: DEFAULT_COOLDOWN_SECS,
        }
    }
}

/// Client configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the game API, without trailing slash
    pub api_base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Where the session record is persisted
    pub storage_path: PathBuf,
    /// Hour of day (UTC) at which the daily round resets
    pub reset_hour_utc: u32,
    /// Policy for failed cooldown fetches
    pub cooldown_fallback: CooldownFallback,
    /// How often the cooldown countdown is recomputed
    pub cooldown_tick: Duration,
    /// How often the reset progress is recomputed
    pub progress_tick: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            request_timeout: Duration::from_secs(10),
            storage_path: PathBuf::from(SESSION_STORAGE_NAME),
            reset_hour_utc: DEFAULT_RESET_HOUR_UTC,
            cooldown_fallback: CooldownFallback::default(),
            cooldown_tick: Duration::from_secs(1),
            progress_tick: Duration::from_secs(60),
        }
    }
}

impl ClientConfig {
    /// Build a config from `NUCLICK_*` environment variables, falling back to
    /// defaults for anything unset.
    ///
    /// `NUCLICK_COOLDOWN_FALLBACK=propagate` disables the fallback cooldown.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let fallback = match var("NUCLICK_COOLDOWN_FALLBACK").as_deref() {
            Some("propagate") => CooldownFallback::Propagate,
            Some("default") | None => CooldownFallback::UseDefault {
                seconds: try_load("NUCLICK_DEFAULT_COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS)?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "NUCLICK_COOLDOWN_FALLBACK",
                    reason: format!("unknown policy {other:?}"),
                })
            }
        };

        let config = Self {
            api_base_url: var("NUCLICK_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_base_url),
            request_timeout: Duration::from_secs(try_load(
                "NUCLICK_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            storage_path: var("NUCLICK_STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_path),
            reset_hour_utc: try_load("NUCLICK_RESET_HOUR_UTC", defaults.reset_hour_utc)?,
            cooldown_fallback: fallback,
            cooldown_tick: defaults.cooldown_tick,
            progress_tick: Duration::from_secs(try_load(
                "NUCLICK_PROGRESS_TICK_SECS",
                defaults.progress_tick.as_secs(),
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reset_hour_utc >= 24 {
            return Err(ConfigError::Invalid {
                key: "reset_hour_utc",
                reason: format!("{} is not an hour of the day", self.reset_hour_utc),
            });
        }
        if self.progress_tick > Duration::from_secs(60) || self.progress_tick.is_zero() {
            return Err(ConfigError::Invalid {
                key: "progress_tick",
                reason: "must be between 1ms and one minute".to_string(),
            });
        }
        if matches!(self.cooldown_fallback, CooldownFallback::UseDefault { seconds: 0 }) {
            return Err(ConfigError::Invalid {
                key: "cooldown_fallback",
                reason: "a default cooldown of 0s never blocks; use the propagate policy instead"
                    .to_string(),
            });
        }
        if self.cooldown_tick.is_zero() {
            return Err(ConfigError::Invalid {
                key: "cooldown_tick",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                reason: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
