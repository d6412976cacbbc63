//! Configuration and settings management
//!
//! Loads settings from config files and environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default base URL of the statistics API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.dashboard.eco";
/// Default directory holding pre-rendered chart images.
pub const DEFAULT_IMAGE_DIR: &str = "img";
/// Default chance of telling the user that data is being fetched.
pub const DEFAULT_WAIT_NOTICE_PROBABILITY: f64 = 0.2;

/// Delays for multi-message flows, in milliseconds from flow start.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct FlowDelays {
    /// Command list after the greeting
    #[serde(default = "default_help_commands_ms")]
    pub help_commands_ms: u64,
    /// Usage hint after the greeting
    #[serde(default = "default_help_hint_ms")]
    pub help_hint_ms: u64,
    /// Hint following the country list
    #[serde(default = "default_list_hint_ms")]
    pub list_hint_ms: u64,
    /// Caption with buttons following the country chart
    #[serde(default = "default_country_caption_ms")]
    pub country_caption_ms: u64,
}

const fn default_help_commands_ms() -> u64 {
    1000
}

const fn default_help_hint_ms() -> u64 {
    3000
}

const fn default_list_hint_ms() -> u64 {
    1000
}

const fn default_country_caption_ms() -> u64 {
    500
}

impl Default for FlowDelays {
    fn default() -> Self {
        Self {
            help_commands_ms: default_help_commands_ms(),
            help_hint_ms: default_help_hint_ms(),
            list_hint_ms: default_list_hint_ms(),
            country_caption_ms: default_country_caption_ms(),
        }
    }
}

impl FlowDelays {
    /// Delays of zero, used where timing is irrelevant.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            help_commands_ms: 0,
            help_hint_ms: 0,
            list_hint_ms: 0,
            country_caption_ms: 0,
        }
    }

    /// Command list offset as a `Duration`
    #[must_use]
    pub const fn help_commands(&self) -> Duration {
        Duration::from_millis(self.help_commands_ms)
    }

    /// Usage hint offset as a `Duration`
    #[must_use]
    pub const fn help_hint(&self) -> Duration {
        Duration::from_millis(self.help_hint_ms)
    }

    /// List hint offset as a `Duration`
    #[must_use]
    pub const fn list_hint(&self) -> Duration {
        Duration::from_millis(self.list_hint_ms)
    }

    /// Country caption offset as a `Duration`
    #[must_use]
    pub const fn country_caption(&self) -> Duration {
        Duration::from_millis(self.country_caption_ms)
    }
}

/// Bot settings shared by every flow.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BotSettings {
    /// Base URL of the statistics API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Directory with chart images
    #[serde(default = "default_image_dir")]
    pub image_dir: PathBuf,
    /// Probability (0.0..=1.0) of the "please wait" notice on country lookups
    #[serde(default = "default_wait_notice_probability")]
    pub wait_notice_probability: f64,
    /// Delays for multi-message flows
    #[serde(default)]
    pub delays: FlowDelays,
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_image_dir() -> PathBuf {
    PathBuf::from(DEFAULT_IMAGE_DIR)
}

const fn default_wait_notice_probability() -> f64 {
    DEFAULT_WAIT_NOTICE_PROBABILITY
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            image_dir: default_image_dir(),
            wait_notice_probability: default_wait_notice_probability(),
            delays: FlowDelays::default(),
        }
    }
}

/// Build the layered configuration source.
///
/// Sources are merged in order: `config/default`, `config/{RUN_MODE}`,
/// `config/local`, `APP__*` variables, then plain environment variables.
///
/// # Errors
///
/// Returns a `ConfigError` if a present source cannot be read.
pub fn build_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
        // Not checked into git
        .add_source(File::with_name("config/local").required(false))
        // Eg.. `APP__API_BASE_URL=http://localhost:8080` sets `api_base_url`
        .add_source(Environment::with_prefix("APP").separator("__"))
        .add_source(Environment::default().ignore_empty(true))
        .build()
}

impl BotSettings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading or validation fails.
    pub fn new() -> Result<Self, ConfigError> {
        let settings: Self = build_config()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.wait_notice_probability) {
            return Err(ConfigError::Message(format!(
                "wait_notice_probability must be within 0.0..=1.0, got {}",
                self.wait_notice_probability
            )));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(ConfigError::Message("api_base_url is empty".to_string()));
        }
        Ok(())
    }
}
