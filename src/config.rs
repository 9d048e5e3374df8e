//! Configuration management for the game-clipper agent

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// OBS WebSocket configuration
    #[serde(default)]
    pub obs: ObsConfig,

    /// Session provisioning configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Local coordinator endpoints
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Source type overrides
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Helper process configuration
    #[serde(default)]
    pub helper: HelperConfig,

    /// Game-context HTTP listener
    #[serde(default)]
    pub server: ServerConfig,

    /// Path to config file (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObsConfig {
    /// OBS WebSocket host
    #[serde(default = "default_obs_host")]
    pub host: String,

    /// OBS WebSocket port
    #[serde(default = "default_obs_port")]
    pub port: u16,

    /// OBS WebSocket password (optional)
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Game provisioned when a session is identified
    #[serde(default = "default_game")]
    pub game: Option<String>,

    /// Delay between identification and provisioning (ms)
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Base URL of the coordinating process
    #[serde(default = "default_coordinator_url")]
    pub base_url: String,

    /// Path hit once provisioning completes
    #[serde(default = "default_ready_path")]
    pub ready_path: String,

    /// Path hit when the active game changes
    #[serde(default = "default_change_game_path")]
    pub change_game_path: String,

    /// Request timeout (ms)
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// Overrides for the per-platform source type mapping
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    pub audio_kind: Option<String>,
    pub video_kind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HelperConfig {
    /// Path to the helper executable
    pub executable: Option<PathBuf>,

    /// Arguments passed to the helper
    #[serde(default)]
    pub args: Vec<String>,

    /// Environment variables added on top of the inherited environment
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the game-context listener binds to
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

// Default value functions
fn default_obs_host() -> String {
    "localhost".to_string()
}

fn default_obs_port() -> u16 {
    4455
}

fn default_game() -> Option<String> {
    Some("KOF XIII".to_string())
}

fn default_settle_delay() -> u64 {
    1000 // lets obs-websocket finish its own setup after Identify
}

fn default_coordinator_url() -> String {
    "http://localhost:4609".to_string()
}

fn default_ready_path() -> String {
    "/obs-ready".to_string()
}

fn default_change_game_path() -> String {
    "/change-game".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4610))
}

impl Default for ObsConfig {
    fn default() -> Self {
        Self {
            host: default_obs_host(),
            port: default_obs_port(),
            password: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            game: default_game(),
            settle_delay_ms: default_settle_delay(),
        }
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_coordinator_url(),
            ready_path: default_ready_path(),
            change_game_path: default_change_game_path(),
            timeout_ms: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl SessionConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl CoordinatorConfig {
    pub fn ready_url(&self) -> String {
        join_url(&self.base_url, &self.ready_path)
    }

    pub fn change_game_url(&self) -> String {
        join_url(&self.base_url, &self.change_game_path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

impl Config {
    /// Load configuration from default location or create default
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let mut config = Config::default();
            config.config_path = Some(config_path);
            config.save()?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        let config_path = self.config_path()?;

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        Ok(())
    }

    /// Get the config file path
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Self::default_config_path(),
        }
    }

    /// Get default config path
    fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = directories::ProjectDirs::from("dev", "game-clipper", "agent")
            .context("Failed to determine config directory")?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
