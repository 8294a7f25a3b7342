//! Standard locations for pd-engine configuration files

use std::path::PathBuf;

/// File name of the engine configuration
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Get the configuration directory
///
/// Returns: `<platform config dir>/pd-engine` (e.g. `~/.config/pd-engine`),
/// or `./pd-engine` when the platform has none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pd-engine")
}

/// Get the default engine config file path
///
/// Returns: `<config dir>/pd-engine/config.yaml`
pub fn default_config_path() -> PathBuf {
    default_config_dir().join(CONFIG_FILE_NAME)
}
