use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{GemdocsError, Result};

/// Name of the configuration file stored inside the config directory.
pub const CONFIG_FILENAME: &str = "config.json";

/// Name of the directory (under the platform config dir) holding our settings.
pub const CONFIG_DIR_NAME: &str = "open-gemdocs";

/// Runtime configuration for the MCP server, the yard daemon and the
/// external Ruby tooling we shell out to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GemdocsConfig {
    /// Port the MCP JSON-RPC endpoint listens on.
    pub mcp_port: u16,
    /// Host used when building documentation URLs for the yard daemon.
    pub yard_host: String,
    /// Port the yard documentation daemon listens on.
    pub yard_port: u16,
    /// Upper bound on how long we wait for a freshly started daemon to listen.
    pub startup_timeout_ms: u64,
    /// Delay between readiness checks while waiting for the daemon.
    pub poll_interval_ms: u64,
    /// Directories searched for pre-generated `<gem>-<version>/.yardoc` databases.
    pub doc_dirs: Vec<PathBuf>,
    /// Executable used to run the registry dump and gem spec scripts.
    pub ruby_bin: String,
    /// RubyGems executable.
    pub gem_bin: String,
    /// `yard` executable, used for `yard server`.
    pub yard_bin: String,
    /// `yardoc` executable, used to build databases.
    pub yardoc_bin: String,
}

impl Default for GemdocsConfig {
    fn default() -> Self {
        let doc_dirs = dirs::home_dir()
            .map(|home| vec![home.join(".yard").join("gems")])
            .unwrap_or_default();

        Self {
            mcp_port: 6789,
            yard_host: "localhost".to_string(),
            yard_port: 8808,
            startup_timeout_ms: 5_000,
            poll_interval_ms: 100,
            doc_dirs,
            ruby_bin: "ruby".to_string(),
            gem_bin: "gem".to_string(),
            yard_bin: "yard".to_string(),
            yardoc_bin: "yardoc".to_string(),
        }
    }
}

impl GemdocsConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Base URL of the yard daemon, e.g. `http://localhost:8808`.
    pub fn yard_base_url(&self) -> String {
        format!("http://{}:{}", self.yard_host, self.yard_port)
    }
}

/// Returns the default configuration file path, e.g.
/// `~/.config/open-gemdocs/config.json` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILENAME))
}

/// Loads the configuration from disk.
///
/// If the file does not exist, returns the default configuration. Missing
/// fields in an existing file fall back to their defaults.
pub fn load_config(config_path: &Path) -> Result<GemdocsConfig> {
    if !config_path.exists() {
        return Ok(GemdocsConfig::default());
    }

    let contents = fs::read_to_string(config_path).map_err(|e| GemdocsError::Config {
        message: format!(
            "failed to read config file '{}': {}",
            config_path.display(),
            e
        ),
    })?;

    serde_json::from_str(&contents).map_err(|e| GemdocsError::Config {
        message: format!(
            "failed to parse config file '{}': {}",
            config_path.display(),
            e
        ),
    })
}

/// Saves the configuration to disk using an atomic write.
///
/// Writes to a temporary file first and then renames it to the final location,
/// so a partial write never corrupts the configuration.
pub fn save_config(config_path: &Path, config: &GemdocsConfig) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| GemdocsError::Config {
            message: format!(
                "failed to create config directory '{}': {}",
                parent.display(),
                e
            ),
        })?;
    }

    let tmp_path = config_path.with_extension("tmp");

    let json = serde_json::to_string_pretty(config).map_err(|e| GemdocsError::Config {
        message: format!("failed to serialize config: {}", e),
    })?;

    fs::write(&tmp_path, &json).map_err(|e| GemdocsError::Config {
        message: format!(
            "failed to write temporary config file '{}': {}",
            tmp_path.display(),
            e
        ),
    })?;

    fs::rename(&tmp_path, config_path).map_err(|e| GemdocsError::Config {
        message: format!(
            "failed to rename temporary config file '{}' to '{}': {}",
            tmp_path.display(),
            config_path.display(),
            e
        ),
    })?;

    Ok(())
}
