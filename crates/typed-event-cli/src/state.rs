//! Application state shared by the config-driven commands.

use std::path::{Path, PathBuf};

use typed_event_core::EventRegistry;
use typed_event_infra::config::{build_registry, load_event_config, load_event_config_strict};
use typed_event_infra::paths::{CONFIG_FILE, resolve_data_dir};
use typed_event_types::config::EventConfig;

/// Loaded configuration and the registry built from it.
#[derive(Clone)]
pub struct AppState {
    pub config_path: PathBuf,
    pub config: EventConfig,
    pub registry: EventRegistry,
}

impl AppState {
    /// Load configuration and declare its events.
    ///
    /// An explicit `config` path must exist and parse. Without one, the data
    /// directory's `events.toml` is read leniently (missing means empty).
    pub async fn init(config: Option<&Path>) -> anyhow::Result<Self> {
        let (config_path, config) = match config {
            Some(path) => (path.to_path_buf(), load_event_config_strict(path).await?),
            None => {
                let data_dir = resolve_data_dir();
                let config = load_event_config(&data_dir).await;
                (data_dir.join(CONFIG_FILE), config)
            }
        };

        let registry = build_registry(&config, &config_path)?;
        tracing::debug!(
            path = %config_path.display(),
            events = registry.len(),
            "loaded event config"
        );

        Ok(Self {
            config_path,
            config,
            registry,
        })
    }
}
