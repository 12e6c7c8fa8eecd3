use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{FetchError, Result};

/// Environment variable overriding [`RetryConfig::max_retries`].
pub const ENV_MAX_RETRIES: &str = "FETCH_RETRY_MAX_RETRIES";
/// Environment variable overriding [`RetryConfig::timeout_ms`].
pub const ENV_TIMEOUT_MS: &str = "FETCH_RETRY_TIMEOUT_MS";
/// Environment variable overriding [`RetryConfig::backoff_multiplier`].
pub const ENV_BACKOFF_MULTIPLIER: &str = "FETCH_RETRY_BACKOFF_MULTIPLIER";

/// Configures per-attempt timeout and retry behavior for one call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Base of the exponential backoff. Retry `i` waits
    /// `backoff_multiplier^i * 1000` milliseconds.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout_ms: 3_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Builds a config from the `FETCH_RETRY_*` environment variables.
    ///
    /// Unset variables keep their defaults. Values that fail to parse or
    /// validate are reported as [`FetchError::Config`].
    pub fn from_env() -> Result<Self> {
        RetryOverrides::from_lookup(|key| std::env::var(key).ok())?.resolve(&Self::default())
    }

    /// Per-attempt timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Delay to wait after the failed attempt with the given index.
    ///
    /// Saturates at [`Duration::MAX`] instead of overflowing.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_multiplier.powi(exp);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Checks the invariants every call relies on.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(FetchError::Config(
                "timeout_ms must be greater than zero".to_owned(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier <= 0.0 {
            return Err(FetchError::Config(format!(
                "backoff_multiplier must be a positive finite number, got {}",
                self.backoff_multiplier
            )));
        }
        Ok(())
    }
}

/// Partial retry configuration; unset fields fall back to a base config.
///
/// Deserializes from camelCase JSON:
/// `{"maxRetries": 5, "timeoutMs": 1000, "backoffMultiplier": 1.5}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct RetryOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backoff_multiplier: Option<f64>,
}

impl RetryOverrides {
    /// Overrides the number of retries after the initial attempt.
    pub fn max_retries(mut self, value: u32) -> Self {
        self.max_retries = Some(value);
        self
    }

    /// Overrides the per-attempt timeout in milliseconds.
    pub fn timeout_ms(mut self, value: u64) -> Self {
        self.timeout_ms = Some(value);
        self
    }

    /// Overrides the base of the exponential backoff.
    pub fn backoff_multiplier(mut self, value: f64) -> Self {
        self.backoff_multiplier = Some(value);
        self
    }

    /// Merges these overrides over `base` without validating.
    pub fn apply_to(&self, base: &RetryConfig) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries.unwrap_or(base.max_retries),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            backoff_multiplier: self.backoff_multiplier.unwrap_or(base.backoff_multiplier),
        }
    }

    /// Merges these overrides over `base` and validates the result.
    pub fn resolve(&self, base: &RetryConfig) -> Result<RetryConfig> {
        let config = self.apply_to(base);
        config.validate()?;
        Ok(config)
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            max_retries: parse_var(&lookup, ENV_MAX_RETRIES)?,
            timeout_ms: parse_var(&lookup, ENV_TIMEOUT_MS)?,
            backoff_multiplier: parse_var(&lookup, ENV_BACKOFF_MULTIPLIER)?,
        })
    }
}

impl From<RetryConfig> for RetryOverrides {
    fn from(config: RetryConfig) -> Self {
        Self {
            max_retries: Some(config.max_retries),
            timeout_ms: Some(config.timeout_ms),
            backoff_multiplier: Some(config.backoff_multiplier),
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|err| FetchError::Config(format!("invalid {key} value '{trimmed}': {err}")))
}
