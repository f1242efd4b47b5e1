//! Configuration loading and value resolution

use crate::{Error, Result};
use std::path::PathBuf;

/// Resolve a configuration value following the priority order:
/// 1. Command-line argument (highest priority)
/// 2. Environment variable
/// 3. TOML config file
/// 4. Compiled default (fallback)
pub fn resolve_value(
    cli_arg: Option<&str>,
    env_var_name: &str,
    config_file_key: &str,
    default: &str,
) -> String {
    // Priority 1: Command-line argument
    if let Some(value) = cli_arg {
        return value.to_string();
    }

    // Priority 2: Environment variable
    if let Ok(value) = std::env::var(env_var_name) {
        return value;
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = load_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(value) = config.get(config_file_key).and_then(|v| v.as_str()) {
                    return value.to_string();
                }
            }
        }
    }

    // Priority 4: Compiled default
    default.to_string()
}

/// Get the configuration file path for the platform
///
/// Linux checks the user config directory first, then /etc/reelfeed.
fn load_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        let user_config = dirs::config_dir().map(|d| d.join("reelfeed").join("config.toml"));
        let system_config = PathBuf::from("/etc/reelfeed/config.toml");

        if let Some(path) = user_config {
            if path.exists() {
                return Ok(path);
            }
        }
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        let path = dirs::config_dir()
            .map(|d| d.join("reelfeed").join("config.toml"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        if path.exists() {
            Ok(path)
        } else {
            Err(Error::Config("No config file found".to_string()))
        }
    }
}
