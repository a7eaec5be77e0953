use std::{
    env,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

pub const ENV_VAR_CONFIG: &str = "FILEMAN_CONFIG";

const APP_DIR: &str = "fileman";
const SETTINGS_FILE: &str = "settings.json";

/// Settings file from `FILEMAN_CONFIG`, else the per-user config directory.
pub fn default_config_file() -> Result<PathBuf> {
    if let Some(path) = env::var_os(ENV_VAR_CONFIG).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(path));
    }

    let config_dir = dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .ok_or(Error::NoHomeDirectory)?;
    Ok(config_dir.join(APP_DIR).join(SETTINGS_FILE))
}

/// A state file stored next to the settings file.
pub fn state_file(config_file: &Path, name: &str) -> PathBuf {
    config_file
        .parent()
        .map_or_else(|| PathBuf::from(name), |dir| dir.join(name))
}
