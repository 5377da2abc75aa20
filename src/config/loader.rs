// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "SSHMUX_CONFIG";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`. This only performs TOML deserialization.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    ConfigFile::try_from(raw_config)
}

/// The config file to use, if any: the explicit path, else `SSHMUX_CONFIG`.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    })
}

/// Load the resolved config file, or fall back to built-in defaults when
/// there is none.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    match resolve_config_path(explicit) {
        Some(path) => load_and_validate(path),
        None => Ok(ConfigFile::default()),
    }
}
