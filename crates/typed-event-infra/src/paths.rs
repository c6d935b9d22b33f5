//! Data directory resolution.

use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const HOME_ENV: &str = "TYPED_EVENT_HOME";

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE: &str = "events.toml";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `TYPED_EVENT_HOME` environment variable
/// 2. `~/.typed-event`
/// 3. `.typed-event` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".typed-event");
    }

    PathBuf::from(".typed-event")
}

/// Path of `events.toml` inside the resolved data directory.
pub fn default_config_path() -> PathBuf {
    resolve_data_dir().join(CONFIG_FILE)
}
