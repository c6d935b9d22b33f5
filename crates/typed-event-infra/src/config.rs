//! Configuration loader for typed-event.
//!
//! Reads `events.toml` from the data directory and deserializes it into
//! [`EventConfig`]. The lenient loader falls back to defaults when the file is
//! missing or malformed; the strict loader reports why.

use std::path::{Path, PathBuf};

use thiserror::Error;
use typed_event_core::EventRegistry;
use typed_event_types::config::EventConfig;
use typed_event_types::error::RegistryError;

use crate::paths::CONFIG_FILE;

/// Minimum broadcast bus capacity (safety floor).
const MIN_BUS_CAPACITY: usize = 16;

/// Errors from the strict loader.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid events in {}: {source}", .path.display())]
    Events {
        path: PathBuf,
        #[source]
        source: RegistryError,
    },
}

/// Load configuration from `{data_dir}/events.toml`.
///
/// - If the file does not exist, returns [`EventConfig::default()`].
/// - If the file exists but fails to read or parse, logs a warning and returns the default.
/// - Otherwise returns the parsed config.
pub async fn load_event_config(data_dir: &Path) -> EventConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No {CONFIG_FILE} found at {}, using defaults", config_path.display());
            return EventConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EventConfig::default();
        }
    };

    match toml::from_str::<EventConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EventConfig::default()
        }
    }
}

/// Load configuration from an explicit file, failing on any problem.
pub async fn load_event_config_strict(path: &Path) -> Result<EventConfig, ConfigError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

    toml::from_str::<EventConfig>(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Build the name-keyed registry declared by `config`.
///
/// `path` is only used to label errors.
pub fn build_registry(config: &EventConfig, path: &Path) -> Result<EventRegistry, ConfigError> {
    EventRegistry::from_config(config).map_err(|source| ConfigError::Events {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolve the broadcast bus capacity.
///
/// Priority:
/// 1. Explicit override (e.g. a CLI flag)
/// 2. `[bus] capacity` from `events.toml`
///
/// A minimum floor of 16 is enforced regardless of source.
pub fn resolve_bus_capacity(config: &EventConfig, override_capacity: Option<usize>) -> usize {
    let capacity = override_capacity.unwrap_or(config.bus.capacity);
    capacity.max(MIN_BUS_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use typed_event_types::config::ErrorPolicy;

    const SAMPLE: &str = r#"
[dispatch]
error_policy = "continue"

[bus]
capacity = 256

[[events]]
name = "user_login"
fields = [
  { name = "username", type = "string" },
  { name = "user_id", type = "integer" },
]
"#;

    #[tokio::test]
    async fn load_event_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_event_config(tmp.path()).await;
        assert_eq!(config.dispatch.error_policy, ErrorPolicy::Stop);
        assert_eq!(config.bus.capacity, 1024);
        assert!(config.events.is_empty());
    }

    #[tokio::test]
    async fn load_event_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), SAMPLE)
            .await
            .unwrap();

        let config = load_event_config(tmp.path()).await;
        assert_eq!(config.dispatch.error_policy, ErrorPolicy::Continue);
        assert_eq!(config.bus.capacity, 256);
        assert_eq!(config.events.len(), 1);
        assert_eq!(config.events[0].name, "user_login");
    }

    #[tokio::test]
    async fn load_event_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join(CONFIG_FILE), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_event_config(tmp.path()).await;
        assert_eq!(config.dispatch.error_policy, ErrorPolicy::Stop);
        assert!(config.events.is_empty());
    }

    #[tokio::test]
    async fn strict_loader_reports_missing_and_malformed_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);

        let err = load_event_config_strict(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        tokio::fs::write(&path, "[dispatch]\nerror_policy = 3").await.unwrap();
        let err = load_event_config_strict(&path).await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("failed to parse"));

        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let config = load_event_config_strict(&path).await.unwrap();
        assert_eq!(config.bus.capacity, 256);
    }

    #[tokio::test]
    async fn build_registry_declares_configured_events() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(CONFIG_FILE);
        tokio::fs::write(&path, SAMPLE).await.unwrap();

        let config = load_event_config_strict(&path).await.unwrap();
        let registry = build_registry(&config, &path).unwrap();
        assert_eq!(registry.names(), vec!["user_login"]);
        assert_eq!(registry.policy(), ErrorPolicy::Continue);
        assert!(registry
            .check("user_login", serde_json::json!(["Alice", 1]))
            .is_ok());
    }

    #[test]
    fn build_registry_reports_duplicate_events() {
        let config: EventConfig = toml::from_str(
            r#"
[[events]]
name = "tick"

[[events]]
name = "tick"
"#,
        )
        .unwrap();
        let err = build_registry(&config, Path::new("events.toml")).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Events {
                source: RegistryError::DuplicateEvent(_),
                ..
            }
        ));
    }

    #[test]
    fn resolve_bus_capacity_with_override() {
        let config = EventConfig::default();
        assert_eq!(resolve_bus_capacity(&config, Some(64)), 64);
    }

    #[test]
    fn resolve_bus_capacity_without_override_uses_config() {
        let mut config = EventConfig::default();
        config.bus.capacity = 512;
        assert_eq!(resolve_bus_capacity(&config, None), 512);
    }

    #[test]
    fn resolve_bus_capacity_enforces_minimum() {
        let mut config = EventConfig::default();
        config.bus.capacity = 2;
        assert_eq!(resolve_bus_capacity(&config, None), MIN_BUS_CAPACITY);
        assert_eq!(resolve_bus_capacity(&config, Some(1)), MIN_BUS_CAPACITY);
    }
}
