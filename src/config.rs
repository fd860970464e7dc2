//! Configuration management for mirror_displayd daemon.
//!
//! Handles loading, parsing, and validation of the YAML configuration file
//! that names the controlled display, the target window, and the listener.

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

/// Main configuration structure for the mirror_displayd daemon.
///
/// Loaded once at startup and shared read-only for the process lifetime.
///
/// # Example
///
/// ```yaml
/// version: 1
/// listen: "0.0.0.0:8080"
/// command_timeout_seconds: 10
/// request_timeout_seconds: 30
///
/// display:
///   display: ":0.0"
///   output: "HDMI-1"
///   rotation: left
///
/// refresh:
///   window_name: "MagicMirror"
///   key: "F5"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    pub version: u8,

    /// Address the HTTP interface binds to.
    #[serde(default = "defaults::listen")]
    pub listen: SocketAddr,

    /// Upper bound for a single external command.
    #[serde(default = "defaults::command_timeout_seconds")]
    pub command_timeout_seconds: u64,

    /// Upper bound for handling a single HTTP request.
    #[serde(default = "defaults::request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Controlled display and output.
    #[serde(default)]
    pub display: DisplayCfg,

    /// Window refresh target.
    pub refresh: RefreshCfg,
}

/// X display and output selection used for power and rotation control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayCfg {
    /// X display identifier (e.g. ":0.0").
    #[serde(default = "defaults::display")]
    pub display: String,

    /// xrandr output name (e.g. "HDMI-1").
    #[serde(default = "defaults::output")]
    pub output: String,

    /// Rotation applied whenever the display is turned on.
    #[serde(default)]
    pub rotation: Rotation,
}

/// Window whose content gets refreshed and the key sent to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCfg {
    /// Name pattern passed to `xdotool search --name`.
    pub window_name: String,

    /// Keysym sent to the matched window.
    #[serde(default = "defaults::key")]
    pub key: String,
}

/// Output rotation as understood by `xrandr --rotate`.
///
/// Unknown values are rejected while parsing the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rotation {
    Normal,
    Inverted,
    #[default]
    Left,
    Right,
}

impl Rotation {
    /// Returns the xrandr argument for this rotation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Rotation::Normal => "normal",
            Rotation::Inverted => "inverted",
            Rotation::Left => "left",
            Rotation::Right => "right",
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            display: defaults::display(),
            output: defaults::output(),
            rotation: Rotation::default(),
        }
    }
}

impl Config {
    /// Validates the configuration for consistency.
    ///
    /// Every identifier ends up as a separate argv entry of an external
    /// command, so none of them may look like a flag.
    pub fn validate(&self) -> Result<()> {
        if self.command_timeout_seconds == 0 {
            anyhow::bail!("command_timeout_seconds must be greater than zero");
        }
        if self.request_timeout_seconds < self.command_timeout_seconds {
            anyhow::bail!(
                "request_timeout_seconds ({}) must not be shorter than command_timeout_seconds ({})",
                self.request_timeout_seconds,
                self.command_timeout_seconds
            );
        }

        validate_argument("display.display", &self.display.display)?;
        validate_argument("display.output", &self.display.output)?;
        validate_argument("refresh.window_name", &self.refresh.window_name)?;
        validate_argument("refresh.key", &self.refresh.key)?;

        if !self
            .refresh
            .key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+')
        {
            anyhow::bail!(
                "refresh.key '{}' is not a valid keysym sequence",
                self.refresh.key
            );
        }

        Ok(())
    }

    /// Timeout applied to every external command.
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_seconds)
    }

    /// Timeout applied to every HTTP request, commands included.
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Loads configuration from file or standard locations.
    ///
    /// Searches for configuration in the following order:
    /// 1. Provided path parameter
    /// 2. MIRROR_DISPLAYD_CONFIG environment variable
    /// 3. XDG_CONFIG_HOME/mirror_displayd/config.yml or ~/.config/mirror_displayd/config.yml
    /// 4. /etc/mirror_displayd/config.yml
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => locate_config().context("No configuration file found")?,
        };

        info!("Loading config from: {}", config_path.display());
        Self::load_from_path(&config_path)
    }

    /// Loads configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        if config.version != 1 {
            anyhow::bail!(
                "Unsupported config version {} in file: {}",
                config.version,
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }
}

fn validate_argument(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{field} must not be empty");
    }
    if value.starts_with('-') {
        anyhow::bail!("{field} '{value}' must not start with '-'");
    }
    Ok(())
}

mod defaults {
    use std::net::{Ipv4Addr, SocketAddr};

    /// Default listen address.
    pub fn listen() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
    }

    /// Default external command timeout in seconds.
    pub fn command_timeout_seconds() -> u64 {
        10
    }

    /// Default HTTP request timeout in seconds.
    pub fn request_timeout_seconds() -> u64 {
        30
    }

    pub fn display() -> String {
        ":0.0".to_string()
    }

    pub fn output() -> String {
        "HDMI-1".to_string()
    }

    pub fn key() -> String {
        "F5".to_string()
    }
}

fn locate_config() -> Result<PathBuf> {
    if let Ok(env_path) = env::var("MIRROR_DISPLAYD_CONFIG") {
        return Ok(PathBuf::from(env_path));
    }

    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("mirror_displayd/config.yml");
        if cfg_dir.exists() {
            return Ok(cfg_dir);
        }
    }

    let etc = Path::new("/etc/mirror_displayd/config.yml");
    if etc.exists() {
        return Ok(etc.to_path_buf());
    }

    anyhow::bail!("Configuration file not found in any standard location")
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        version: 1,
        listen: defaults::listen(),
        command_timeout_seconds: defaults::command_timeout_seconds(),
        request_timeout_seconds: defaults::request_timeout_seconds(),
        display: DisplayCfg::default(),
        refresh: RefreshCfg {
            window_name: "MagicMirror".to_string(),
            key: defaults::key(),
        },
    }
}
