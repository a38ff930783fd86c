//! Demo command sequence
//!
//! Drives a prepared bridge through a typical ground-station session and logs
//! every result code.

use crate::DemoConfig;
use camera_bridge::{
    CameraBridge, CameraError, CameraResult, Information, Mode, Setting, Status, VideoStreamInfo,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Settings applied and read back by [`run_settings`]
const SETTINGS_SEQUENCE: [(&str, &str); 6] = [
    ("CAM_WBMODE", "1"),
    ("CAM_EXPMODE", "0"),
    ("CAM_EV", "2.0"),
    ("CAM_EXPMODE", "1"),
    ("CAM_SHUTTERSPD", "0.016666"),
    ("CAM_ISO", "6400"),
];

fn log_result<T>(operation: &str, result: &Result<T, CameraError>) -> CameraResult {
    let code = CameraResult::from(result);
    match result {
        Ok(_) => info!("{} result: {}", operation, code),
        Err(e) => warn!("{} result: {} ({})", operation, code, e),
    }
    code
}

/// Log information, stream and status updates
pub fn subscribe(bridge: &CameraBridge) {
    bridge.information_async(Some(Arc::new(|info: Information| {
        info!(
            "Camera information: {} {} firmware {}",
            info.vendor_name, info.model_name, info.firmware_version
        );
    })));
    bridge.video_stream_info_async(Some(Arc::new(|streams: Vec<VideoStreamInfo>| {
        for stream in streams {
            info!(
                "Video stream {}: {:?} {}x{} @ {} Hz",
                stream.stream_id,
                stream.status,
                stream.settings.horizontal_resolution_pix,
                stream.settings.vertical_resolution_pix,
                stream.settings.frame_rate_hz
            );
        }
    })));
    bridge.status_async(Some(Arc::new(|status: Status| {
        info!(
            "Camera status: video {} interval {} storage {:.0}/{:.0} MiB",
            status.video_on,
            status.photo_interval_on,
            status.used_storage_mib,
            status.total_storage_mib
        );
    })));
}

/// Capture and mode commands. Returns the result code of each step.
pub fn run_operations(bridge: &CameraBridge, config: &DemoConfig) -> Vec<(&'static str, CameraResult)> {
    let mut results = Vec::new();

    results.push(("format storage", log_result("format storage", &bridge.format_storage(1))));
    results.push(("take photo", log_result("take photo", &bridge.take_photo())));

    let started = bridge.start_photo_interval(config.interval_s);
    results.push(("start photo interval", log_result("start photo interval", &started)));
    if started.is_ok() {
        match Duration::try_from_secs_f32(config.interval_duration_s) {
            Ok(duration) => std::thread::sleep(duration),
            Err(e) => warn!(
                "Invalid demo interval duration {}: {}",
                config.interval_duration_s, e
            ),
        }
    }
    results.push((
        "stop photo interval",
        log_result("stop photo interval", &bridge.stop_photo_interval()),
    ));

    results.push(("start video", log_result("start video", &bridge.start_video())));
    results.push((
        "start video streaming",
        log_result("start video streaming", &bridge.start_video_streaming(1)),
    ));
    results.push((
        "stop video streaming",
        log_result("stop video streaming", &bridge.stop_video_streaming(1)),
    ));
    // Rejected while recording
    results.push((
        "set photo mode",
        log_result("set photo mode", &bridge.set_mode(Mode::Photo)),
    ));
    results.push(("stop video", log_result("stop video", &bridge.stop_video())));
    results.push((
        "set photo mode",
        log_result("set photo mode", &bridge.set_mode(Mode::Photo)),
    ));
    results.push((
        "set video mode",
        log_result("set video mode", &bridge.set_mode(Mode::Video)),
    ));
    results.push((
        "reset settings",
        log_result("reset settings", &bridge.reset_settings()),
    ));

    results
}

fn set_and_read(bridge: &CameraBridge, id: &str, value: &str) -> bool {
    let result = bridge.set_setting(&Setting::new(id, value));
    log_result(&format!("set {} = {}", id, value), &result);
    if result.is_err() {
        return false;
    }

    match bridge.get_setting(&Setting::query(id)) {
        Ok(setting) if setting.option.option_id == value => true,
        Ok(setting) => {
            warn!(
                "{} read back {} after setting {}",
                id, setting.option.option_id, value
            );
            false
        }
        Err(e) => {
            warn!("{} could not be read back: {}", id, e);
            false
        }
    }
}

/// Apply the settings sequence, then mode-scoped settings. Returns false at
/// the first setting that did not read back as written.
pub fn run_settings(bridge: &CameraBridge) -> bool {
    for (id, value) in SETTINGS_SEQUENCE {
        if !set_and_read(bridge, id, value) {
            return false;
        }
    }

    log_result("set video mode", &bridge.set_mode(Mode::Video));
    let video = set_and_read(bridge, "CAM_VIDFMT", "2") && set_and_read(bridge, "CAM_VIDRES", "5");

    log_result("set photo mode", &bridge.set_mode(Mode::Photo));
    let photo = set_and_read(bridge, "CAM_PHOTORATIO", "3");

    video && photo
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_bridge::BridgeConfig;
    use camera_driver::SimulatedDriver;

    fn bridge() -> (SimulatedDriver, CameraBridge) {
        let sim = SimulatedDriver::new();
        let bridge = CameraBridge::new(Arc::new(sim.clone()), BridgeConfig::fast()).unwrap();
        bridge.prepare().unwrap();
        (sim, bridge)
    }

    #[test]
    fn test_operations_sequence() {
        let (sim, bridge) = bridge();
        subscribe(&bridge);
        let config = DemoConfig {
            enabled: true,
            interval_s: 0.05,
            interval_duration_s: 0.12,
        };

        let results = run_operations(&bridge, &config);
        let codes: Vec<CameraResult> = results.iter().map(|(_, code)| *code).collect();
        assert_eq!(
            codes,
            vec![
                CameraResult::Success,
                CameraResult::Success,
                CameraResult::Success,
                CameraResult::Success,
                CameraResult::Success,
                CameraResult::Success,
                CameraResult::Success,
                CameraResult::Busy,
                CameraResult::Success,
                CameraResult::Success,
                CameraResult::Success,
                CameraResult::Success,
            ]
        );
        assert!(sim.calls("take_photo") >= 2);
        assert!(!sim.is_recording());
    }

    #[test]
    fn test_invalid_interval_duration_skips_wait() {
        let (_sim, bridge) = bridge();
        for duration in [f32::INFINITY, -1.0, f32::NAN] {
            let config = DemoConfig {
                enabled: true,
                interval_s: 0.05,
                interval_duration_s: duration,
            };
            let results = run_operations(&bridge, &config);
            assert_eq!(results[2], ("start photo interval", CameraResult::Success));
            assert_eq!(results[3], ("stop photo interval", CameraResult::Success));
        }
    }

    #[test]
    fn test_settings_sequence() {
        let (_sim, bridge) = bridge();
        assert!(run_settings(&bridge));
        assert_eq!(bridge.mode(), Mode::Photo);
    }
}
