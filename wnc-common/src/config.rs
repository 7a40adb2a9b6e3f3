//! Configuration file loading and data folder resolution

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Application folder name under the OS config/data directories
const APP_DIR: &str = "wnc";

/// Config file name under the application config folder
const CONFIG_FILE_NAME: &str = "config.toml";

/// Data folder resolution, in priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config value (already loaded by the caller)
/// 4. OS-dependent compiled default (fallback)
pub fn resolve_data_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> PathBuf {
    let env_value = std::env::var(env_var_name).ok().filter(|v| !v.trim().is_empty());

    let mut sources = Vec::new();
    if cli_arg.is_some() {
        sources.push("command line");
    }
    if env_value.is_some() {
        sources.push("environment");
    }
    if toml_value.is_some() {
        sources.push("TOML");
    }
    if sources.len() > 1 {
        warn!(
            "Data folder found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Some(path) = env_value {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// Config file location: CLI → ENV → OS default
///
/// Returns `None` when no location could be determined at all. The returned
/// path may not exist yet.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    default_config_path()
}

/// Default config file path for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
}

/// Get OS-dependent default data folder path
pub fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "macos") {
        // ~/Library/Application Support/wnc
        dirs::data_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("./wnc_data"))
    } else {
        // ~/.local/share/wnc or %LOCALAPPDATA%\wnc
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("./wnc_data"))
    }
}

/// Read and parse a TOML file
///
/// # Errors
/// `NotFound` when the file is missing, `Toml` when it does not parse.
pub fn read_toml_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(Error::NotFound(format!("Config file not found: {}", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    let config = toml::from_str(&content)?;
    debug!(path = %path.display(), "Loaded TOML config");
    Ok(config)
}

/// Load a TOML config, falling back to defaults on any failure
///
/// A missing file is normal and logged at debug level; a malformed file is
/// logged as a warning. Never fails.
pub fn load_toml_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> T {
    let Some(path) = path else {
        return T::default();
    };
    match read_toml_config(path) {
        Ok(config) => config,
        Err(Error::NotFound(_)) => {
            debug!(path = %path.display(), "No config file, using defaults");
            T::default()
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed config file, using defaults");
            T::default()
        }
    }
}

/// Write a config struct as TOML, creating parent folders
///
/// Writes to a sibling temp file and renames it over the target.
pub fn write_toml_config<T: Serialize>(config: &T, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
