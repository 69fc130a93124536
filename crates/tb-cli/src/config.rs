//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tb_core::check::DEFAULT_MIN_GAP_MINUTES;
use tb_core::{CheckerConfig, DEFAULT_MAX_ATTEMPTS, RetryPolicy, UnparsableTimePolicy};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Anthropic API key used for generation.
    pub api_key: Option<String>,
    /// Model used for generation.
    pub model: String,
    /// Maximum number of generator calls per request.
    pub max_attempts: u32,
    /// Minimum free minutes between consecutive classes on one day.
    pub min_gap_minutes: u16,
    /// Whether blocks with unreadable times invalidate a candidate.
    pub unparsable_times: UnparsableTimePolicy,
    /// Timeout for a single generator call, in seconds.
    pub request_timeout_secs: u64,
    /// Response token limit for a single generator call.
    pub max_tokens: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("max_attempts", &self.max_attempts)
            .field("min_gap_minutes", &self.min_gap_minutes)
            .field("unparsable_times", &self.unparsable_times)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            model: tb_llm::DEFAULT_MODEL.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            min_gap_minutes: DEFAULT_MIN_GAP_MINUTES,
            unparsable_times: UnparsableTimePolicy::default(),
            request_timeout_secs: tb_llm::DEFAULT_TIMEOUT.as_secs(),
            max_tokens: tb_llm::DEFAULT_MAX_TOKENS,
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // The conventional Anthropic variable, overridden by TB_API_KEY
        figment = figment.merge(
            Env::raw()
                .only(&["ANTHROPIC_API_KEY"])
                .map(|_| "api_key".into()),
        );

        // Load from environment variables (TB_*)
        figment = figment.merge(Env::prefixed("TB_"));

        figment.extract()
    }

    /// The API key, if set to a non-blank value.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Retry settings, with an optional override of the attempt budget.
    pub fn retry_policy(&self, max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            max_attempts: max_attempts.unwrap_or(self.max_attempts),
            checker: self.checker(),
        }
    }

    pub const fn checker(&self) -> CheckerConfig {
        CheckerConfig {
            min_gap_minutes: self.min_gap_minutes,
            unparsable_times: self.unparsable_times,
        }
    }
}

/// Returns the platform-specific config directory for tb.
///
/// On Linux: `~/.config/tb`
pub fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("tb"))
}
