//! Simulated camera driver
//!
//! In-memory driver used by tests and by the server when no hardware driver
//! is configured. Supports fault injection per operation (fixed failure or
//! artificial delay), call counting, and a forced disconnect.

use crate::driver::{CameraDriver, DriverEvent, EventSink};
use crate::error::DriverStatus;
use crate::parameter::{NativeKind, NativeValue, Parameter};
use crate::types::{
    CameraInformation, DriverMode, NativeCapture, StorageInformation, StorageStatus, StorageType,
    StreamDescriptor, StreamSpectrum,
};
use crate::DriverResult;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

/// Mutable state of the simulated camera
struct SimState {
    open: bool,
    available: bool,
    mode: DriverMode,
    parameters: HashMap<Parameter, NativeValue>,
    recording: bool,
    streams: Vec<StreamDescriptor>,
    streaming: HashSet<i32>,
    storage: StorageInformation,
    captures: Vec<NativeCapture>,
    cameras: Vec<i32>,
    selected_camera: i32,
    timestamp_ms: Option<i64>,
    sink: Option<EventSink>,
    failures: HashMap<&'static str, DriverStatus>,
    delays: HashMap<&'static str, Duration>,
    calls: HashMap<&'static str, usize>,
}

/// In-memory camera driver
#[derive(Clone)]
pub struct SimulatedDriver {
    state: Arc<Mutex<SimState>>,
}

/// Size of one simulated photo (MiB)
const PHOTO_SIZE_MIB: f32 = 4.0;

/// Factory defaults of the simulated camera
fn default_parameters() -> HashMap<Parameter, NativeValue> {
    [
        (Parameter::WHITE_BALANCE_MODE, NativeValue::Enum(0)),
        (Parameter::EXPOSURE_MODE, NativeValue::Enum(0)),
        (Parameter::EXPOSURE_VALUE, NativeValue::Float(0.0)),
        (Parameter::ISO, NativeValue::Integer(100)),
        (Parameter::SHUTTER_SPEED, NativeValue::Float(0.01)),
        (Parameter::VIDEO_FORMAT, NativeValue::Enum(0)),
        (Parameter::VIDEO_RESOLUTION, NativeValue::Enum(0)),
        (Parameter::PHOTO_RATIO, NativeValue::Enum(0)),
        (Parameter::PHOTO_FORMAT, NativeValue::Enum(0)),
        (Parameter::METERING_MODE, NativeValue::Enum(0)),
        (Parameter::FLICKER, NativeValue::Enum(0)),
    ]
    .into_iter()
    .map(|(name, value)| (Parameter::new(name), value))
    .collect()
}

fn default_storage() -> StorageInformation {
    StorageInformation {
        storage_id: 1,
        storage_type: StorageType::Microsd,
        status: StorageStatus::Formatted,
        total_mib: 30_436.0,
        used_mib: 0.0,
        available_mib: 30_436.0,
        media_folder: "/DCIM/100MEDIA".to_string(),
    }
}

fn default_streams() -> Vec<StreamDescriptor> {
    vec![
        StreamDescriptor {
            stream_id: 1,
            frame_rate_hz: 30.0,
            width: 1920,
            height: 1080,
            bit_rate: 8_000_000,
            rotation_deg: 0,
            uri: "rtsp://192.168.144.25:8554/main".to_string(),
            horizontal_fov_deg: 81.0,
            spectrum: StreamSpectrum::VisibleLight,
        },
        StreamDescriptor {
            stream_id: 2,
            frame_rate_hz: 15.0,
            width: 640,
            height: 480,
            bit_rate: 1_000_000,
            rotation_deg: 0,
            uri: "rtsp://192.168.144.25:8554/sub".to_string(),
            horizontal_fov_deg: 81.0,
            spectrum: StreamSpectrum::VisibleLight,
        },
    ]
}

impl SimulatedDriver {
    /// Create a simulated camera in Photo mode with one microSD card
    pub fn new() -> Self {
        info!("Creating simulated camera driver");
        Self {
            state: Arc::new(Mutex::new(SimState {
                open: false,
                available: true,
                mode: DriverMode::Photo,
                parameters: default_parameters(),
                recording: false,
                streams: default_streams(),
                streaming: HashSet::new(),
                storage: default_storage(),
                captures: Vec::new(),
                cameras: vec![0],
                selected_camera: 0,
                timestamp_ms: None,
                sink: None,
                failures: HashMap::new(),
                delays: HashMap::new(),
                calls: HashMap::new(),
            })),
        }
    }

    /// Simulate a missing driver module: `open` reports `NotAvailable`
    pub fn unavailable() -> Self {
        let driver = Self::new();
        driver.lock().available = false;
        driver
    }

    /// Expose several camera endpoints
    pub fn with_cameras(self, cameras: Vec<i32>) -> Self {
        {
            let mut state = self.lock();
            state.selected_camera = cameras.first().copied().unwrap_or(0);
            state.cameras = cameras;
        }
        self
    }

    /// Make every call of `operation` fail with `status`
    pub fn fail(&self, operation: &'static str, status: DriverStatus) {
        self.lock().failures.insert(operation, status);
    }

    /// Make every call of `operation` block for `delay` before proceeding
    pub fn delay(&self, operation: &'static str, delay: Duration) {
        self.lock().delays.insert(operation, delay);
    }

    /// Add a parameter beyond the factory set. `reset_settings` leaves it as is.
    pub fn add_parameter(&self, parameter: Parameter, value: NativeValue) {
        self.lock().parameters.insert(parameter, value);
    }

    /// Current value of a parameter, bypassing fault injection
    pub fn parameter(&self, parameter: &Parameter) -> Option<NativeValue> {
        self.lock().parameters.get(parameter).copied()
    }

    /// Remove injected failures and delays
    pub fn clear_faults(&self) {
        let mut state = self.lock();
        state.failures.clear();
        state.delays.clear();
    }

    /// Number of times `operation` reached the driver
    pub fn calls(&self, operation: &'static str) -> usize {
        self.lock().calls.get(operation).copied().unwrap_or(0)
    }

    /// Whether the device is currently recording
    pub fn is_recording(&self) -> bool {
        self.lock().recording
    }

    /// Whether a stream is running
    pub fn is_streaming(&self, stream_id: i32) -> bool {
        self.lock().streaming.contains(&stream_id)
    }

    /// Last timestamp forwarded by the bridge
    pub fn timestamp_ms(&self) -> Option<i64> {
        self.lock().timestamp_ms
    }

    /// Currently selected camera endpoint
    pub fn selected_camera(&self) -> i32 {
        self.lock().selected_camera
    }

    /// Add a capture to the storage index without raising an event
    pub fn insert_capture(&self, capture: NativeCapture) {
        self.lock().captures.push(capture);
    }

    /// Raise a storage refresh as if the card changed underneath
    pub fn push_storage_update(&self, storage: StorageInformation) {
        let sink = {
            let mut state = self.lock();
            state.storage = storage.clone();
            state.sink.clone()
        };
        if let Some(sink) = sink {
            sink(DriverEvent::StorageUpdated(storage));
        }
    }

    /// Drop the device: later calls fail and the sink receives `Disconnected`
    pub fn disconnect(&self) {
        info!("Simulated camera disconnected");
        let sink = {
            let mut state = self.lock();
            state.open = false;
            state.available = false;
            state.sink.clone()
        };
        if let Some(sink) = sink {
            sink(DriverEvent::Disconnected);
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Count the call, apply injected delay, then injected failure
    fn enter(&self, operation: &'static str) -> DriverResult<MutexGuard<'_, SimState>> {
        let delay = {
            let mut state = self.lock();
            *state.calls.entry(operation).or_insert(0) += 1;
            state.delays.get(operation).copied()
        };
        if let Some(delay) = delay {
            debug!("Simulated {} delayed by {:?}", operation, delay);
            std::thread::sleep(delay);
        }

        let state = self.lock();
        if let Some(status) = state.failures.get(operation) {
            return Err(*status);
        }
        if operation != "open" && !state.open {
            return Err(DriverStatus::NotAvailable);
        }
        Ok(state)
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraDriver for SimulatedDriver {
    fn open(&self) -> DriverResult<()> {
        let mut state = self.enter("open")?;
        if !state.available {
            return Err(DriverStatus::NotAvailable);
        }
        state.open = true;
        Ok(())
    }

    fn close(&self) {
        let mut state = self.lock();
        *state.calls.entry("close").or_insert(0) += 1;
        state.open = false;
        state.recording = false;
        state.streaming.clear();
    }

    fn take_photo(&self) -> DriverResult<()> {
        let (sink, capture) = {
            let mut state = self.enter("take_photo")?;
            let time_utc_us = chrono::Utc::now().timestamp_micros().max(0) as u64;
            let capture = NativeCapture {
                file_path: format!(
                    "{}/IMG_{:04}.JPG",
                    state.storage.media_folder,
                    state.captures.len() + 1
                ),
                time_utc_us,
                success: true,
            };
            state.captures.push(capture.clone());
            state.storage.used_mib += PHOTO_SIZE_MIB;
            state.storage.available_mib = (state.storage.total_mib - state.storage.used_mib).max(0.0);
            (state.sink.clone(), capture)
        };

        if let Some(sink) = sink {
            std::thread::spawn(move || sink(DriverEvent::CaptureCompleted(capture)));
        }
        Ok(())
    }

    fn mode(&self) -> DriverResult<DriverMode> {
        Ok(self.enter("mode")?.mode)
    }

    fn set_mode(&self, mode: DriverMode) -> DriverResult<()> {
        let mut state = self.enter("set_mode")?;
        if state.recording && mode != DriverMode::Video {
            return Err(DriverStatus::Denied);
        }
        state.mode = mode;
        Ok(())
    }

    fn get_parameter(&self, parameter: &Parameter) -> DriverResult<NativeValue> {
        let state = self.enter("get_parameter")?;
        state
            .parameters
            .get(parameter)
            .copied()
            .ok_or(DriverStatus::Unsupported)
    }

    fn set_parameter(&self, parameter: &Parameter, value: NativeValue) -> DriverResult<()> {
        let mut state = self.enter("set_parameter")?;
        match state.parameters.get_mut(parameter) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(DriverStatus::Unsupported),
        }
    }

    fn parameter_kind(&self, parameter: &Parameter) -> Option<NativeKind> {
        self.lock().parameters.get(parameter).map(NativeValue::kind)
    }

    fn subscribe_events(&self, sink: EventSink) {
        self.lock().sink = Some(sink);
    }

    fn start_video(&self) -> DriverResult<()> {
        let mut state = self.enter("start_video")?;
        if state.mode != DriverMode::Video {
            return Err(DriverStatus::Denied);
        }
        if state.recording {
            return Err(DriverStatus::InProgress);
        }
        state.recording = true;
        Ok(())
    }

    fn stop_video(&self) -> DriverResult<()> {
        let mut state = self.enter("stop_video")?;
        state.recording = false;
        Ok(())
    }

    fn video_streams(&self) -> DriverResult<Vec<StreamDescriptor>> {
        Ok(self.enter("video_streams")?.streams.clone())
    }

    fn start_video_streaming(&self, stream_id: i32) -> DriverResult<()> {
        let mut state = self.enter("start_video_streaming")?;
        if !state.streams.iter().any(|s| s.stream_id == stream_id) {
            return Err(DriverStatus::Denied);
        }
        state.streaming.insert(stream_id);
        Ok(())
    }

    fn stop_video_streaming(&self, stream_id: i32) -> DriverResult<()> {
        let mut state = self.enter("stop_video_streaming")?;
        state.streaming.remove(&stream_id);
        Ok(())
    }

    fn reset_settings(&self) -> DriverResult<()> {
        let mut state = self.enter("reset_settings")?;
        state.parameters.extend(default_parameters());
        Ok(())
    }

    fn storage_devices(&self) -> DriverResult<Vec<StorageInformation>> {
        Ok(vec![self.enter("storage_devices")?.storage.clone()])
    }

    fn format_storage(&self, storage_id: i32) -> DriverResult<()> {
        let (sink, storage) = {
            let mut state = self.enter("format_storage")?;
            if state.storage.storage_id != storage_id {
                return Err(DriverStatus::Denied);
            }
            state.captures.clear();
            state.storage.used_mib = 0.0;
            state.storage.available_mib = state.storage.total_mib;
            state.storage.status = StorageStatus::Formatted;
            (state.sink.clone(), state.storage.clone())
        };
        if let Some(sink) = sink {
            sink(DriverEvent::StorageUpdated(storage));
        }
        Ok(())
    }

    fn list_captures(&self) -> DriverResult<Vec<NativeCapture>> {
        Ok(self.enter("list_captures")?.captures.clone())
    }

    fn information(&self) -> DriverResult<CameraInformation> {
        let state = self.enter("information")?;
        Ok(CameraInformation {
            vendor_name: "Simulated".to_string(),
            model_name: format!("SIM-C10 #{}", state.selected_camera),
            firmware_version: "1.0.0".to_string(),
            focal_length_mm: 4.5,
            horizontal_sensor_size_mm: 6.17,
            vertical_sensor_size_mm: 4.55,
            horizontal_resolution_px: 4000,
            vertical_resolution_px: 3000,
            lens_id: 0,
            definition_file_version: 1,
            definition_file_uri: "mftp://C10.xml".to_string(),
        })
    }

    fn camera_ids(&self) -> Vec<i32> {
        self.lock().cameras.clone()
    }

    fn select_camera(&self, camera_id: i32) -> DriverResult<()> {
        let mut state = self.enter("select_camera")?;
        if !state.cameras.contains(&camera_id) {
            return Err(DriverStatus::Denied);
        }
        state.selected_camera = camera_id;
        Ok(())
    }

    fn set_timestamp(&self, timestamp_ms: i64) -> DriverResult<()> {
        let mut state = self.enter("set_timestamp")?;
        state.timestamp_ms = Some(timestamp_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn opened() -> SimulatedDriver {
        let driver = SimulatedDriver::new();
        driver.open().unwrap();
        driver
    }

    #[test]
    fn test_calls_fail_before_open() {
        let driver = SimulatedDriver::new();
        assert_eq!(driver.take_photo(), Err(DriverStatus::NotAvailable));
    }

    #[test]
    fn test_unavailable_driver() {
        let driver = SimulatedDriver::unavailable();
        assert_eq!(driver.open(), Err(DriverStatus::NotAvailable));
    }

    #[test]
    fn test_parameter_round_trip() {
        let driver = opened();
        let iso = Parameter::new(Parameter::ISO);
        driver.set_parameter(&iso, NativeValue::Integer(6400)).unwrap();
        assert_eq!(driver.get_parameter(&iso), Ok(NativeValue::Integer(6400)));
        assert_eq!(driver.parameter_kind(&iso), Some(NativeKind::Integer));
    }

    #[test]
    fn test_added_parameter() {
        let driver = opened();
        let zoom = Parameter::new("CAM_ZOOM");
        assert_eq!(driver.get_parameter(&zoom), Err(DriverStatus::Unsupported));
        assert_eq!(driver.parameter_kind(&zoom), None);

        driver.add_parameter(zoom.clone(), NativeValue::Float(1.0));
        driver.set_parameter(&zoom, NativeValue::Float(2.5)).unwrap();
        assert_eq!(driver.get_parameter(&zoom), Ok(NativeValue::Float(2.5)));
    }

    #[test]
    fn test_capture_event_delivered() {
        let driver = opened();
        let (tx, rx) = mpsc::channel();
        driver.subscribe_events(Arc::new(move |event| {
            let _ = tx.send(event);
        }));

        driver.take_photo().unwrap();
        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        match event {
            DriverEvent::CaptureCompleted(capture) => assert!(capture.success),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(driver.list_captures().unwrap().len(), 1);
    }

    #[test]
    fn test_fault_injection() {
        let driver = opened();
        driver.fail("take_photo", DriverStatus::Failed);
        assert_eq!(driver.take_photo(), Err(DriverStatus::Failed));
        assert_eq!(driver.calls("take_photo"), 1);

        driver.clear_faults();
        assert!(driver.take_photo().is_ok());
        assert_eq!(driver.calls("take_photo"), 2);
    }

    #[test]
    fn test_video_requires_video_mode() {
        let driver = opened();
        assert_eq!(driver.start_video(), Err(DriverStatus::Denied));
        driver.set_mode(DriverMode::Video).unwrap();
        assert!(driver.start_video().is_ok());
        assert_eq!(driver.set_mode(DriverMode::Photo), Err(DriverStatus::Denied));
    }

    #[test]
    fn test_format_clears_captures() {
        let driver = opened();
        driver.take_photo().unwrap();
        driver.format_storage(1).unwrap();
        assert!(driver.list_captures().unwrap().is_empty());
        assert_eq!(driver.format_storage(9), Err(DriverStatus::Denied));
    }
}
