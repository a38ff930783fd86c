//! Camera Server
//!
//! Hosts a [`CameraBridge`] in a process: loads configuration, sets up
//! logging, supplies the camera definition document and optionally runs the
//! demo command sequence.

pub mod demo;

use anyhow::Context;
use camera_bridge::{BridgeConfig, CameraBridge};
use serde::{Deserialize, Serialize};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Environment variable prefix, e.g. `CAMERA_SERVER__BRIDGE__COMMAND_TIMEOUT_MS`
pub const ENV_PREFIX: &str = "CAMERA_SERVER";

/// Demo sequence options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Run the demo after `prepare`
    pub enabled: bool,
    /// Photo interval used by the demo (seconds)
    pub interval_s: f32,
    /// How long the photo interval runs (seconds)
    pub interval_duration_s: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_s: 1.0,
            interval_duration_s: 5.0,
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Maximum log level (`error`, `warn`, `info`, `debug`, `trace`)
    pub log_level: String,
    /// Camera definition document; the bundled one is used when unset
    pub definition_path: Option<String>,
    pub bridge: BridgeConfig,
    pub demo: DemoConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            definition_path: None,
            bridge: BridgeConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load from an optional config file (`path` without extension is
    /// accepted), overridden by `CAMERA_SERVER__*` environment variables.
    pub fn load(path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn level(&self) -> Level {
        self.log_level.parse().unwrap_or(Level::INFO)
    }
}

/// Initialize logging
pub fn init_logging(level: Level) -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

/// Load the configured definition document into the bridge
pub fn load_definition(bridge: &CameraBridge, config: &ServerConfig) -> anyhow::Result<()> {
    let Some(path) = config.definition_path.as_deref() else {
        info!("Using bundled camera definition");
        return Ok(());
    };

    let document = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read camera definition {}", path))?;
    bridge
        .load_definition(&document)
        .with_context(|| format!("Invalid camera definition {}", path))?;
    info!("Loaded camera definition from {}", path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_driver::SimulatedDriver;
    use std::sync::Arc;

    #[test]
    fn test_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.level(), Level::INFO);
        assert!(config.definition_path.is_none());
        assert_eq!(config.bridge.command_timeout_ms, 3000);
        assert!(config.demo.enabled);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = ServerConfig::load("does-not-exist/camera-server").unwrap();
        assert_eq!(config.bridge.poll_timeout_ms, 1000);
    }

    #[test]
    fn test_config_file_overrides() {
        let dir = std::env::temp_dir().join(format!("camera-server-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("camera-server.toml");
        std::fs::write(
            &path,
            "log_level = \"debug\"\n[bridge]\ncommand_timeout_ms = 500\n[demo]\nenabled = false\n",
        )
        .unwrap();

        let config = ServerConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.level(), Level::DEBUG);
        assert_eq!(config.bridge.command_timeout_ms, 500);
        assert_eq!(config.bridge.poll_timeout_ms, 1000);
        assert!(!config.demo.enabled);

        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_unreadable_definition_is_error() {
        let bridge = CameraBridge::new(Arc::new(SimulatedDriver::new()), BridgeConfig::fast()).unwrap();
        let config = ServerConfig {
            definition_path: Some("does-not-exist/C10.xml".to_string()),
            ..Default::default()
        };
        assert!(load_definition(&bridge, &config).is_err());
    }
}
