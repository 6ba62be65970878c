// src/core/paths.rs

use crate::constants::{APP_DIR_NAME, CONFIG_DIR_ENV_VAR, SETTINGS_FILENAME};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

static APP_CONFIG_DIR: OnceLock<PathBuf> = OnceLock::new();

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Returns the application configuration directory (`~/.config/hatch-envs` by default,
/// or the directory named by `HATCH_ENVS_CONFIG_DIR`). Creates it if it doesn't exist.
///
/// This function is memoized: the first successful call computes and caches the path,
/// subsequent calls return the cached value.
pub fn get_app_config_dir() -> Result<PathBuf, PathError> {
    if let Some(path) = APP_CONFIG_DIR.get() {
        return Ok(path.clone());
    }

    let config_path = match std::env::var_os(CONFIG_DIR_ENV_VAR) {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => dirs::config_dir()
            .ok_or(PathError::ConfigDirNotFound)?
            .join(APP_DIR_NAME),
    };

    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| PathError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    // A concurrent first call may have won the race; either value is the same path.
    Ok(APP_CONFIG_DIR.get_or_init(|| config_path).clone())
}

/// Returns the path to the `settings.toml` file.
pub fn get_settings_path() -> Result<PathBuf, PathError> {
    get_app_config_dir().map(|dir| dir.join(SETTINGS_FILENAME))
}

/// Location of the Python interpreter inside a virtual environment root.
pub fn python_executable(env_root: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        env_root.join("Scripts").join("python.exe")
    } else {
        env_root.join("bin").join("python")
    }
}

/// Directory holding the activation scripts of a virtual environment.
pub fn scripts_dir(env_root: &Path) -> PathBuf {
    if cfg!(target_os = "windows") {
        env_root.join("Scripts")
    } else {
        env_root.join("bin")
    }
}

/// True if `ancestor` equals `path` or is one of its parent directories.
/// Comparison is component-wise, so `/repo` does not contain `/repository`.
pub fn is_ancestor_or_self(ancestor: &Path, path: &Path) -> bool {
    dunce::simplified(path).starts_with(dunce::simplified(ancestor))
}
