//! Queue configuration and status types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_PENALTY, Priority};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid queue config: {0}")]
    InvalidConfig(String),
}

/// Current operational state of a queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    /// Queue admits new work as slots free up.
    #[default]
    Running,
    /// No new admissions; in-flight jobs still finish.
    Paused,
}

impl std::fmt::Display for QueueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueState::Running => write!(f, "running"),
            QueueState::Paused => write!(f, "paused"),
        }
    }
}

/// Configuration for queue behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of compression calls in flight.
    pub concurrency_limit: usize,
    /// Retries granted to each job after its first failure.
    pub max_retries: u32,
    /// Priority increment applied to retried jobs.
    pub retry_penalty: Priority,
    /// Turn on web optimization for every enqueued job.
    pub force_web_optimized: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_penalty: DEFAULT_RETRY_PENALTY,
            force_web_optimized: true,
        }
    }
}

impl QueueConfig {
    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = limit;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Check that the config can drive a queue.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency_limit == 0 {
            return Err(ConfigError::InvalidConfig(
                "concurrency_limit must be at least 1".into(),
            ));
        }
        if self.retry_penalty <= 0 {
            return Err(ConfigError::InvalidConfig(format!(
                "retry_penalty must be positive, got {}",
                self.retry_penalty
            )));
        }
        if self
            .retry_penalty
            .checked_mul(i64::from(self.max_retries))
            .is_none()
        {
            return Err(ConfigError::InvalidConfig(format!(
                "retry_penalty {} times max_retries {} overflows the priority range",
                self.retry_penalty, self.max_retries
            )));
        }
        Ok(())
    }

    /// Build a config from environment variables.
    ///
    /// - `QUEUE_CONCURRENCY` (default: 3)
    /// - `QUEUE_MAX_RETRIES` (default: 2)
    /// - `QUEUE_RETRY_PENALTY` (default: 1000)
    /// - `QUEUE_FORCE_WEB_OPTIMIZED` (`true`/`false`, default: true)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let cfg = Self {
            concurrency_limit: parse_env("QUEUE_CONCURRENCY")?
                .unwrap_or(defaults.concurrency_limit),
            max_retries: parse_env("QUEUE_MAX_RETRIES")?.unwrap_or(defaults.max_retries),
            retry_penalty: parse_env("QUEUE_RETRY_PENALTY")?.unwrap_or(defaults.retry_penalty),
            force_web_optimized: parse_bool_env("QUEUE_FORCE_WEB_OPTIMIZED")?
                .unwrap_or(defaults.force_web_optimized),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}

fn read_env(var_name: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(var_name) {
        Ok(v) if v.trim().is_empty() => Ok(None),
        Ok(v) => Ok(Some(v.trim().to_string())),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::InvalidConfig(format!(
            "failed reading {var_name}: {e}"
        ))),
    }
}

fn parse_env<T>(var_name: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(v) = read_env(var_name)? else {
        return Ok(None);
    };
    v.parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidConfig(format!("invalid value for {var_name}={v}: {e}")))
}

fn parse_bool_env(var_name: &str) -> Result<Option<bool>, ConfigError> {
    let Some(v) = read_env(var_name)? else {
        return Ok(None);
    };
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" => Ok(Some(true)),
        "0" | "false" | "no" | "n" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidConfig(format!(
            "invalid boolean for {var_name}={v} (expected true/false)"
        ))),
    }
}

/// Progress snapshot emitted after every queue mutation.
///
/// `total` is computed at emission time and can grow again when a job is
/// re-queued for retry. `completed` and `failed` are always zero here;
/// callers accumulate them from completion notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueProgress {
    /// Jobs currently in flight.
    pub current: usize,
    /// In-flight plus waiting jobs.
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub processing: bool,
}

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStatus {
    pub waiting_count: usize,
    pub active_count: usize,
    pub is_processing: bool,
    pub paused: bool,
}

impl QueueStatus {
    /// No waiting or active work.
    pub fn is_idle(&self) -> bool {
        self.waiting_count == 0 && self.active_count == 0
    }
}
