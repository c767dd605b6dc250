use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::{
    AVATAR_TIMEOUT_SECS, CONFIG_ENV_PREFIX, DEFAULT_API_URL, HEALTH_TIMEOUT_SECS,
    NOTIFICATION_DURATION_MS, NOTIFICATION_FADE_MS, TURN_TIMEOUT_SECS,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Advice service connection settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Transient notification timing
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Chat surface configuration
    #[serde(default)]
    pub ui: UIConfig,
}

/// Advice service connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the Lox Genie API
    pub api_url: String,
    /// Deadline for /genie and /wish/generate calls
    pub request_timeout_secs: u64,
    /// How long the avatar lookup may race before it counts as absent
    pub avatar_timeout_secs: u64,
    /// Deadline for the /health probe
    pub health_timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: TURN_TIMEOUT_SECS,
            avatar_timeout_secs: AVATAR_TIMEOUT_SECS,
            health_timeout_secs: HEALTH_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn avatar_timeout(&self) -> Duration {
        Duration::from_secs(self.avatar_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }
}

/// Transient notification timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Total lifetime of a notification
    pub duration_ms: u64,
    /// Trailing part of the lifetime spent fading out
    pub fade_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            duration_ms: NOTIFICATION_DURATION_MS,
            fade_ms: NOTIFICATION_FADE_MS,
        }
    }
}

impl NotificationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }

    pub fn fade(&self) -> Duration {
        Duration::from_millis(self.fade_ms)
    }
}

/// Chat surface configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIConfig {
    /// Print a line when the avatar lookup settles
    pub show_avatar_status: bool,
    /// Colorize the transcript
    pub color: bool,
}

impl Default for UIConfig {
    fn default() -> Self {
        Self {
            show_avatar_status: true,
            color: true,
        }
    }
}

/// Load configuration from multiple sources
pub fn load_config() -> Result<Config> {
    let global_config = get_config_dir()?.join("config.toml");
    let local_config = PathBuf::from(".genie/config.toml");

    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if global_config.exists() {
        figment = figment.merge(Toml::file(&global_config));
    }

    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    extract(figment)
}

/// Load configuration from an explicit file, skipping the global and local layers
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        anyhow::bail!("Config file not found: {}", path.display());
    }
    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Toml::file(path));
    extract(figment)
}

fn extract(figment: Figment) -> Result<Config> {
    // GENIE_BACKEND__API_URL -> backend.api_url
    figment
        .merge(Env::prefixed(CONFIG_ENV_PREFIX).split("__"))
        .extract()
        .context("Failed to load configuration")
}

/// Get the configuration directory
pub fn get_config_dir() -> Result<PathBuf> {
    if let Some(proj_dirs) = ProjectDirs::from("", "", "lox-genie") {
        let config_dir = proj_dirs.config_dir();
        std::fs::create_dir_all(config_dir)?;
        Ok(config_dir.to_path_buf())
    } else {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Could not determine home directory")?;
        let config_dir = PathBuf::from(home).join(".config").join("lox-genie");
        std::fs::create_dir_all(&config_dir)?;
        Ok(config_dir)
    }
}

/// Save configuration to file
pub fn save_config(config: &Config, path: Option<PathBuf>) -> Result<()> {
    let path = if let Some(p) = path {
        p
    } else {
        get_config_dir()?.join("config.toml")
    };

    let toml_string = toml::to_string_pretty(config)?;
    std::fs::write(&path, toml_string)
        .with_context(|| format!("Failed to write config to {}", path.display()))?;

    Ok(())
}

/// Create a default configuration file if it doesn't exist
pub fn init_config() -> Result<()> {
    let config_file = get_config_dir()?.join("config.toml");

    if !config_file.exists() {
        save_config(&Config::default(), Some(config_file.clone()))?;
        println!("Created default configuration at: {}", config_file.display());
    }

    let local_example = PathBuf::from(".genie/config.toml.example");
    if !local_example.exists() {
        if let Some(parent) = local_example.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let example_config = r#"# Lox Genie local configuration
# This file overrides global settings for this directory

[backend]
api_url = "http://localhost:8000"
request_timeout_secs = 60
avatar_timeout_secs = 10

[notifications]
duration_ms = 3000
fade_ms = 500
"#;
        std::fs::write(&local_example, example_config)?;
        println!("Created example configuration at: {}", local_example.display());
    }

    Ok(())
}
