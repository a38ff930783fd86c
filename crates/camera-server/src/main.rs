//! Camera Server - Main Entry Point

use anyhow::Context;
use camera_bridge::CameraBridge;
use camera_driver::SimulatedDriver;
use camera_server::{demo, init_logging, load_definition, ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};

fn main() -> anyhow::Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "camera-server".to_string());
    let config = ServerConfig::load(&config_path).context("Failed to load configuration")?;
    init_logging(config.level())?;

    info!("=== Camera Server v{} ===", env!("CARGO_PKG_VERSION"));

    let bridge = CameraBridge::new(Arc::new(SimulatedDriver::new()), config.bridge.clone())
        .context("Failed to create camera bridge")?;
    demo::subscribe(&bridge);
    bridge.prepare().context("Failed to prepare camera")?;
    load_definition(&bridge, &config)?;

    if config.demo.enabled {
        demo::run_operations(&bridge, &config.demo);
        if !demo::run_settings(&bridge) {
            warn!("Settings sequence did not complete");
        }
    }

    info!("Camera server ready, press Ctrl-C to stop");
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create signal runtime")?
        .block_on(tokio::signal::ctrl_c())
        .context("Failed to wait for Ctrl-C")?;

    info!("Shutting down");
    bridge.close();
    Ok(())
}
