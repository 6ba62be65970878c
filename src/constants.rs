// src/constants.rs

/// Identifier under which the manager registers itself with the host.
pub const MANAGER_ID: &str = "hatch";

/// Human-readable name of the manager.
pub const MANAGER_DISPLAY_NAME: &str = "Hatch";

/// Package manager the host should use for environments owned by this manager.
/// The `pip` package manager uses `uv` internally when it is available.
pub const PREFERRED_PACKAGE_MANAGER_ID: &str = "ms-python.python:pip";

/// Default executable name of the external environment tool.
pub const HATCH_EXECUTABLE: &str = "hatch";

/// Environment picked when no explicit assignment exists for a scope.
pub const DEFAULT_ENV_NAME: &str = "default";

/// Name of the application directory inside the system config directory.
pub const APP_DIR_NAME: &str = "hatch-envs";

/// Name of the settings file (inside the application config directory).
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// Environment variable that overrides the application config directory.
pub const CONFIG_DIR_ENV_VAR: &str = "HATCH_ENVS_CONFIG_DIR";

/// Capacity of each change-notification channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;
