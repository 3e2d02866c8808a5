//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Shared TOML configuration file contents.
///
/// Each service reads the same file layout; keys a service does not use are
/// simply ignored by it.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Root folder for databases and stored media
    pub root_folder: Option<String>,
    /// Ingest gateway bind host
    pub host: Option<String>,
    /// Ingest gateway bind port
    pub port: Option<u16>,
    /// Base URL of the network-address geolocation provider
    pub ip_lookup_url: Option<String>,
    /// Base URL of the reverse-geocoding provider
    pub reverse_geocode_url: Option<String>,
    /// Secret used to sign media references
    pub media_secret: Option<String>,
    /// Lifetime of signed media references, in seconds
    pub media_url_ttl_seconds: Option<u64>,
    /// Gateway base URL used by the capture client
    pub gateway_url: Option<String>,
    /// External still-photo command for the capture client camera backend
    pub camera_still_command: Option<String>,
    /// External frame-grab command for the capture client camera backend
    pub camera_frame_command: Option<String>,
}

/// Resolve the root folder following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable `TXP_ROOT_FOLDER`
/// 3. TOML config file `root_folder` key
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_root_folder(cli_arg: Option<&str>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("TXP_ROOT_FOLDER") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config) = load_toml_config() {
        if let Some(root_folder) = config.root_folder {
            return PathBuf::from(root_folder);
        }
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// Get the configuration file path for the platform.
///
/// `~/.config/txp/config.toml` on Linux/macOS-style layouts, with
/// `/etc/txp/config.toml` as a system-wide fallback on Linux.
pub fn config_file_path() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("txp").join("config.toml"));

    if let Some(path) = &user_config {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/txp/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    user_config.ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load the TOML configuration file, if present.
pub fn load_toml_config() -> Result<TomlConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        return Ok(TomlConfig::default());
    }
    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read config failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse config failed: {}", e)))
}

/// Write the TOML configuration file (best-effort, creates parent dirs).
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize config failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// OS-dependent default root folder path
fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("txp"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/txp"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("txp"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/txp"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("txp"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\txp"))
    } else {
        PathBuf::from("./txp_data")
    }
}

/// Ensure the root folder directory exists, creating it if missing.
pub fn ensure_root_folder(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root)?;
    Ok(())
}
