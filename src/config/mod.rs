//! Configuration management

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable prefix (SONOS_WEB_BASE_URL, SONOS_WEB_VOLUME_STEP, ...)
const ENV_PREFIX: &str = "SONOS_WEB";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Controller API endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Delay before the sync loop retries after a failed request
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Connect timeout for API requests (there is no overall request timeout)
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Volume change applied optimistically per step command
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,

    /// Controls that update local state before the controller confirms
    #[serde(default = "default_optimistic_controls")]
    pub optimistic_controls: Vec<OptimisticControl>,

    /// Zone to select on startup
    #[serde(default)]
    pub zone: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            retry_delay_ms: default_retry_delay_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            volume_step: default_volume_step(),
            optimistic_controls: default_optimistic_controls(),
            zone: None,
        }
    }
}

impl Config {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn is_optimistic(&self, control: OptimisticControl) -> bool {
        self.optimistic_controls.contains(&control)
    }

    fn validate(self) -> Result<Self> {
        url::Url::parse(&self.base_url)
            .map_err(|e| anyhow!("invalid base_url {:?}: {}", self.base_url, e))?;
        if self.volume_step == 0 || self.volume_step > zone_model::MAX_VOLUME {
            return Err(anyhow!(
                "volume_step must be between 1 and {}, got {}",
                zone_model::MAX_VOLUME,
                self.volume_step
            ));
        }
        Ok(self)
    }
}

/// A control whose effect is applied locally before the round trip completes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimisticControl {
    Volume,
    Mute,
}

fn default_base_url() -> String {
    "http://127.0.0.1:9999/api".to_string()
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_volume_step() -> u8 {
    5
}

fn default_optimistic_controls() -> Vec<OptimisticControl> {
    vec![OptimisticControl::Volume, OptimisticControl::Mute]
}

/// Directory holding `config.{toml,json,yaml}`
pub fn get_config_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "sonos-web", "sonos-web-client")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Load configuration from the default config directory and the environment
pub fn load_config() -> Result<Config> {
    load_config_from(&get_config_dir().join("config"))
}

/// Load configuration from an explicit file stem (extension optional) and the
/// environment. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config> {
    let config = ::config::Config::builder()
        // Start with defaults
        .set_default("base_url", default_base_url())?
        // Load from config file if it exists
        .add_source(::config::File::with_name(&path.to_string_lossy()).required(false))
        // Override with environment variables (SONOS_WEB_BASE_URL, SONOS_WEB_RETRY_DELAY_MS, etc.)
        .add_source(
            ::config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("optimistic_controls"),
        )
        .build()?;

    let config: Config = config.try_deserialize()?;
    config.validate()
}
