// src/settings.rs

use crate::constants::{DEFAULT_ENV_NAME, HATCH_EXECUTABLE};
use crate::core::paths;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Could not locate the settings directory: {0}")]
    Path(#[from] paths::PathError),
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Failed to serialize settings: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Failed to expand '{template}': {message}")]
    Expand { template: String, message: String },
}

/// User settings read from `settings.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Executable used to run Hatch. `~` and environment variables are expanded.
    pub hatch_executable: String,
    /// Environment picked for a scope that has no explicit assignment.
    pub default_env_name: String,
    /// Project roots known without the host telling us.
    pub projects: Vec<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            hatch_executable: HATCH_EXECUTABLE.to_string(),
            default_env_name: DEFAULT_ENV_NAME.to_string(),
            projects: Vec::new(),
        }
    }
}

impl Settings {
    /// The Hatch executable with `~` and `$VAR` expanded.
    pub fn hatch_command(&self) -> Result<String, SettingsError> {
        shellexpand::full(&self.hatch_executable)
            .map(|s| s.into_owned())
            .map_err(|e| SettingsError::Expand {
                template: self.hatch_executable.clone(),
                message: e.to_string(),
            })
    }
}

/// Loads `settings.toml` from the application config directory,
/// writing the defaults there first if the file doesn't exist.
pub fn load_settings() -> Result<Settings, SettingsError> {
    let settings_path = paths::get_settings_path()?;
    load_settings_from(&settings_path)
}

pub fn load_settings_from(settings_path: &Path) -> Result<Settings, SettingsError> {
    if !settings_path.exists() {
        log::debug!(
            "No settings at '{}', writing defaults",
            settings_path.display()
        );
        let defaults = Settings::default();
        let toml_string = toml::to_string_pretty(&defaults)?;
        fs::write(settings_path, toml_string)?;
        Ok(defaults)
    } else {
        let content = fs::read_to_string(settings_path)?;
        Ok(toml::from_str(&content)?)
    }
}
