//! Provider configuration.

use std::time::Duration;

use pipeline::ForgeError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default endpoint for the OpenAI chat-completions API.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Upper bound accepted for `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 10;

/// A provider setting that would make every request fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A required string setting is blank.
    #[error("provider.{field} must not be empty")]
    EmptyField { field: &'static str },

    /// `max_retries` is above [`MAX_RETRIES_LIMIT`].
    #[error("provider.max_retries must be at most {}, got {value}", MAX_RETRIES_LIMIT)]
    TooManyRetries { value: u32 },

    /// A zero timeout would fail every request immediately.
    #[error("provider.request_timeout_secs must be positive")]
    ZeroTimeout,

    /// The first retry delay exceeds the ceiling it is capped by.
    #[error("provider.initial_backoff_ms ({initial}) exceeds provider.max_backoff_ms ({max})")]
    BackoffAboveCeiling { initial: u64, max: u64 },
}

impl From<ConfigError> for ForgeError {
    fn from(e: ConfigError) -> Self {
        ForgeError::Configuration {
            message: e.to_string(),
        }
    }
}

/// Settings for an OpenAI-compatible chat-completions endpoint.
///
/// Durations are expressed in whole seconds or milliseconds so the struct can
/// be read directly from a TOML `[provider]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL up to and including the API version segment.
    pub base_url: String,
    /// Model identifier sent with every request.
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// Sampling temperature; omitted from requests when `None`.
    pub temperature: Option<f32>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Retries after the first attempt for retryable failures.
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds. Doubles per attempt.
    pub initial_backoff_ms: u64,
    /// Ceiling for the retry delay, in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: None,
            request_timeout_secs: 300,
            max_retries: 3,
            initial_backoff_ms: 1_000,
            max_backoff_ms: 30_000,
        }
    }
}

impl ProviderConfig {
    /// Checks the settings that would make every request fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("base_url", &self.base_url),
            ("model", &self.model),
            ("api_key_env", &self.api_key_env),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField { field });
            }
        }
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(ConfigError::TooManyRetries {
                value: self.max_retries,
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::BackoffAboveCeiling {
                initial: self.initial_backoff_ms,
                max: self.max_backoff_ms,
            });
        }
        Ok(())
    }

    /// Per-request timeout applied to the HTTP client.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Longest delay between attempts, including service-requested ones.
    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }

    /// Delay before retry number `attempt` (0-based), before any
    /// service-requested override.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        let delay = self.initial_backoff_ms.saturating_mul(factor);
        Duration::from_millis(delay).min(self.max_backoff())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(ProviderConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_unusable_settings() {
        let config = ProviderConfig {
            model: " ".into(),
            ..ProviderConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::EmptyField { field: "model" })
        );

        let config = ProviderConfig {
            max_retries: 11,
            ..ProviderConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyRetries { value: 11 })
        );

        let config = ProviderConfig {
            initial_backoff_ms: 5_000,
            max_backoff_ms: 1_000,
            ..ProviderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BackoffAboveCeiling { .. })
        ));
    }

    #[test]
    fn config_errors_surface_as_configuration_failures() {
        let err = ForgeError::from(ConfigError::ZeroTimeout);
        match err {
            ForgeError::Configuration { message } => {
                assert!(message.contains("request_timeout_secs"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = ProviderConfig {
            initial_backoff_ms: 100,
            max_backoff_ms: 500,
            ..ProviderConfig::default()
        };
        assert_eq!(config.backoff(0), Duration::from_millis(100));
        assert_eq!(config.backoff(1), Duration::from_millis(200));
        assert_eq!(config.backoff(2), Duration::from_millis(400));
        assert_eq!(config.backoff(3), Duration::from_millis(500));
        assert_eq!(config.backoff(64), Duration::from_millis(500));
    }

    #[test]
    fn partial_tables_fill_in_defaults() {
        let config: ProviderConfig = serde_json::from_str(r#"{ "model": "gpt-4o-mini" }"#).unwrap();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_retries, 3);
    }
}
