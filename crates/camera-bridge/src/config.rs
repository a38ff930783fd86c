//! Bridge configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Bounded wait for a driver acknowledgement (milliseconds)
    pub command_timeout_ms: u64,

    /// Bounded wait of poll variants for first data (milliseconds)
    pub poll_timeout_ms: u64,

    /// Move the `SinceConnection` reference point on every successful `prepare`.
    /// When false, the reference is set once and kept across reconnects.
    pub reset_photo_reference_on_prepare: bool,

    /// Worker threads of the driver-call pool
    pub driver_threads: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            command_timeout_ms: 3000,
            poll_timeout_ms: 1000,
            reset_photo_reference_on_prepare: true,
            driver_threads: 4,
        }
    }
}

impl BridgeConfig {
    /// Short timeouts for tests against a simulated driver
    pub fn fast() -> Self {
        Self {
            command_timeout_ms: 300,
            poll_timeout_ms: 100,
            ..Default::default()
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}
