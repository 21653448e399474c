use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration section owned by Represence
pub const SECTION: &str = "fileInfo";

/// Fully qualified key of the port setting
pub const WEBSOCKET_PORT_KEY: &str = "fileInfo.websocketPort";

/// Fully qualified key of the logging switch
pub const ENABLE_LOGGING_KEY: &str = "fileInfo.enableLogging";

pub const DEFAULT_PORT: u16 = 3847;

/// Contents of the config file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub file_info: Settings,
}

/// Settings of the `fileInfo` section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Port the WebSocket server binds to. Read at each start; `0` lets the OS pick.
    #[serde(default = "default_port")]
    pub websocket_port: u16,

    /// Gates diagnostic logging. No effect on what clients receive.
    #[serde(default)]
    pub enable_logging: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            websocket_port: DEFAULT_PORT,
            enable_logging: false,
        }
    }
}

impl Settings {
    /// Fully qualified keys whose values differ between `self` and `other`.
    #[must_use]
    pub fn changed_keys(&self, other: &Settings) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.websocket_port != other.websocket_port {
            keys.push(WEBSOCKET_PORT_KEY);
        }
        if self.enable_logging != other.enable_logging {
            keys.push(ENABLE_LOGGING_KEY);
        }
        keys
    }
}

impl Config {
    /// Load config from file. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        super::validation::warn_unknown_fields(&content, "config.json");
        Self::parse(&content)
    }

    /// Parse config text without checking for unknown keys.
    ///
    /// # Errors
    ///
    /// Returns an error if `content` is not a valid config document.
    pub fn parse(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Save config to file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
