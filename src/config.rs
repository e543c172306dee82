//! Configuration and settings management
//!
//! Loads repeat detection options and bot settings from config files and
//! environment variables.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Longest accepted group idle timeout (100 years, in minutes).
pub const MAX_GROUP_IDLE_MINUTES: u64 = 100 * 365 * 24 * 60;

/// Repeat detection options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatConfig {
    /// Global toggle
    #[serde(rename = "repeat_enabled")]
    pub enabled: bool,
    /// Only messages this recent count toward a repeat (minutes)
    #[serde(rename = "repeat_time_window_minutes")]
    pub time_window_minutes: u64,
    /// Maximum number of recent messages kept per group
    #[serde(rename = "repeat_message_window_size")]
    pub message_window_size: usize,
    /// Identical messages needed to trigger an echo
    #[serde(rename = "repeat_required_same_count")]
    pub required_same_count: usize,
    /// Longer messages are ignored (characters)
    #[serde(rename = "repeat_max_message_length")]
    pub max_message_length: usize,
    /// Minimum gap before the same content is echoed again (minutes)
    #[serde(rename = "repeat_cooldown_minutes")]
    pub repeat_cooldown_minutes: u64,
    /// Drop a group's state after this long without messages (minutes, 0 = never)
    #[serde(rename = "repeat_group_idle_minutes")]
    pub group_idle_minutes: u64,
}

impl Default for RepeatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            time_window_minutes: 5,
            message_window_size: 10,
            required_same_count: 3,
            max_message_length: 100,
            repeat_cooldown_minutes: 10,
            group_idle_minutes: 0,
        }
    }
}

impl RepeatConfig {
    /// Load repeat settings from config files and environment variables.
    ///
    /// Priority: env vars → config files → defaults. Falls back to defaults
    /// when loading fails.
    #[must_use]
    pub fn from_env() -> Self {
        Self::load().unwrap_or_else(|err| {
            warn!(error = %err, "Failed to load repeat config, using defaults");
            Self::default()
        })
    }

    /// Load repeat settings, returning the error instead of falling back.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a source cannot be read or a value has the
    /// wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?
            .add_sources()
            .build()?
            .try_deserialize()
    }

    /// Whether a message from `group_id` with body `text` should be tracked.
    ///
    /// Rejects everything while disabled, empty group ids, empty text and text
    /// longer than `max_message_length` characters.
    #[must_use]
    pub fn accepts(&self, group_id: &str, text: &str) -> bool {
        if !self.enabled || group_id.is_empty() || text.is_empty() {
            return false;
        }
        if !self.accepts_length(text) {
            debug!(group_id, "repeat_config: skipping (message too long)");
            return false;
        }
        true
    }

    /// Whether `text` is short enough to be tracked.
    #[must_use]
    pub fn accepts_length(&self, text: &str) -> bool {
        text.chars().count() <= self.max_message_length
    }

    /// Idle eviction timeout, `None` when groups are never evicted.
    ///
    /// Values above [`MAX_GROUP_IDLE_MINUTES`] disable eviction.
    #[must_use]
    pub fn group_idle_timeout(&self) -> Option<Duration> {
        match self.group_idle_minutes {
            0 => None,
            minutes if minutes > MAX_GROUP_IDLE_MINUTES => {
                warn!(
                    group_idle_minutes = minutes,
                    max = MAX_GROUP_IDLE_MINUTES,
                    "Group idle timeout out of range, eviction disabled"
                );
                None
            }
            minutes => Some(Duration::from_secs(minutes * 60)),
        }
    }

    fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Self::default();
        builder
            .set_default("repeat_enabled", defaults.enabled)?
            .set_default("repeat_time_window_minutes", defaults.time_window_minutes)?
            .set_default(
                "repeat_message_window_size",
                defaults.message_window_size as u64,
            )?
            .set_default(
                "repeat_required_same_count",
                defaults.required_same_count as u64,
            )?
            .set_default(
                "repeat_max_message_length",
                defaults.max_message_length as u64,
            )?
            .set_default("repeat_cooldown_minutes", defaults.repeat_cooldown_minutes)?
            .set_default("repeat_group_idle_minutes", defaults.group_idle_minutes)
    }
}

/// Bot settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Telegram Bot API token
    pub telegram_token: String,
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails or the token is missing.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = Config::builder().add_sources().build()?.try_deserialize()?;
        if settings.telegram_token.is_empty() {
            return Err(ConfigError::Message("telegram_token is empty".to_string()));
        }
        Ok(settings)
    }
}

trait SourcesExt {
    fn add_sources(self) -> Self;
}

impl SourcesExt for ConfigBuilder<DefaultState> {
    fn add_sources(self) -> Self {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());
        self.add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys
            .add_source(Environment::default().ignore_empty(true))
    }
}
