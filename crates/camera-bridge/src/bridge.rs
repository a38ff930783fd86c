//! Camera Bridge
//!
//! Protocol-facing command surface. Every command validates its
//! preconditions against the state tracker first, then issues at most the
//! driver calls it needs through the executor, commits the resulting state and
//! finally notifies subscribers. No lock is held across a driver call or a
//! subscriber callback.

use crate::config::BridgeConfig;
use crate::definition::CameraDefinition;
use crate::dispatcher::{Callback, Subscriptions};
use crate::error::CameraError;
use crate::executor::DriverExecutor;
use crate::interval::IntervalWorker;
use crate::registry::SettingsRegistry;
use crate::tracker::{Activity, StateTracker};
use crate::types::{
    CaptureInfo, Information, Mode, PhotosRange, Setting, SettingOptions, Status, VideoStreamInfo,
};
use camera_driver::{CameraDriver, DriverEvent, DriverMode, DriverStatus};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Bridge between protocol callers and one camera driver
///
/// # Thread Safety
/// All commands take `&self` and may be called concurrently. Share the bridge
/// through an `Arc`. Subscriber callbacks run on the thread that produced the
/// event (a caller, a driver or the interval thread).
pub struct CameraBridge {
    inner: Arc<BridgeInner>,
}

struct BridgeInner {
    config: BridgeConfig,
    executor: DriverExecutor,
    tracker: StateTracker,
    subscriptions: Subscriptions,
    registry: RwLock<Arc<SettingsRegistry>>,
    /// Whether the driver handle is open. A disconnect leaves it open until
    /// close or the next prepare releases it. Serialises prepare and close.
    opened: Mutex<bool>,
}

fn now_utc_us() -> u64 {
    chrono::Utc::now().timestamp_micros().max(0) as u64
}

impl CameraBridge {
    /// Create a bridge around `driver`. The driver is not opened until
    /// [`CameraBridge::prepare`].
    pub fn new(driver: Arc<dyn CameraDriver>, config: BridgeConfig) -> Result<Self, CameraError> {
        let executor =
            DriverExecutor::new(driver, config.driver_threads, config.command_timeout())?;
        let registry = SettingsRegistry::bundled()?
            .with_native_kinds(|p| executor.driver().parameter_kind(p));

        info!(
            "Camera bridge created (command timeout {:?}, poll timeout {:?})",
            config.command_timeout(),
            config.poll_timeout()
        );

        Ok(Self {
            inner: Arc::new(BridgeInner {
                config,
                executor,
                tracker: StateTracker::new(),
                subscriptions: Subscriptions::new(),
                registry: RwLock::new(Arc::new(registry)),
                opened: Mutex::new(false),
            }),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.inner.config
    }

    /// Whether a driver handle is currently held
    pub fn is_connected(&self) -> bool {
        self.inner.tracker.is_connected()
    }

    /// Open the driver and take the initial state snapshot. A no-op once
    /// prepared.
    pub fn prepare(&self) -> Result<(), CameraError> {
        let inner = &self.inner;
        let mut opened = inner.opened.lock().unwrap_or_else(|e| e.into_inner());

        if inner.tracker.is_connected() {
            debug!("Camera already prepared");
            return Ok(());
        }
        if *opened {
            debug!("Releasing driver handle left by a disconnect");
            inner.release_driver();
            *opened = false;
        }

        info!("Preparing camera");
        match inner.executor.run("open", |d| d.open())? {
            Ok(()) => {}
            Err(DriverStatus::NotAvailable) => {
                warn!("No camera behind the driver handle");
                return Err(CameraError::DriverUnavailable);
            }
            Err(status) => {
                error!("Camera initialization failed: {}", status);
                return Err(CameraError::InitializationFailed(status));
            }
        }
        *opened = true;

        let weak: Weak<BridgeInner> = Arc::downgrade(inner);
        inner
            .executor
            .driver()
            .subscribe_events(Arc::new(move |event: DriverEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.handle_event(event);
                }
            }));

        inner.tracker.set_connected(true);
        inner.tracker.begin_connection(
            now_utc_us(),
            inner.config.reset_photo_reference_on_prepare,
        );
        inner.refresh_mode();
        inner.refresh_information();
        inner.refresh_streams();
        inner.refresh_storage();
        inner.tracker.invalidate_settings();

        let settings = inner.settings_snapshot();
        info!(
            "Camera prepared in {:?} mode with {} settings",
            inner.tracker.mode(),
            settings.len()
        );

        inner.publish_mode();
        inner.publish_information();
        inner.publish_streams();
        inner.publish_status();
        inner.subscriptions.current_settings.notify(settings);
        inner.publish_setting_options();
        Ok(())
    }

    /// Stop every session, release the driver and mark the bridge
    /// disconnected. Safe to call repeatedly.
    pub fn close(&self) {
        let inner = &self.inner;
        let mut opened = inner.opened.lock().unwrap_or_else(|e| e.into_inner());

        if let Some(worker) = inner.tracker.clear_sessions() {
            worker.stop(&inner.executor, inner.executor.timeout());
        }

        if !*opened {
            return;
        }
        info!("Closing camera");
        inner.tracker.set_connected(false);
        inner.release_driver();
        *opened = false;
        inner.publish_status();
    }

    /// Replace the settings registry with one built from a definition document
    pub fn load_definition(&self, document: &str) -> Result<(), CameraError> {
        let definition = CameraDefinition::parse(document)?;
        let registry = SettingsRegistry::from_definition(&definition)
            .with_native_kinds(|p| self.inner.executor.driver().parameter_kind(p));
        if registry.is_empty() {
            return Err(CameraError::InvalidArgument(
                "camera definition declares no supported settings".to_string(),
            ));
        }

        *self
            .inner
            .registry
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Arc::new(registry);
        self.inner.tracker.invalidate_settings();
        self.inner.publish_setting_options();
        self.inner.publish_settings();
        Ok(())
    }

    /// Capture a single photo. The capture itself is reported through
    /// `capture_info`.
    pub fn take_photo(&self) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        let _reservation = inner.tracker.reserve("take_photo")?;

        debug!("Taking photo");
        inner.executor.call("take_photo", |d| d.take_photo())
    }

    /// Capture a photo every `interval_s` seconds until stopped
    pub fn start_photo_interval(&self, interval_s: f32) -> Result<(), CameraError> {
        let period = Duration::try_from_secs_f32(interval_s)
            .ok()
            .filter(|p| !p.is_zero())
            .ok_or_else(|| {
                CameraError::InvalidArgument(format!(
                    "photo interval must be positive, got {}",
                    interval_s
                ))
            })?;

        let inner = &self.inner;
        inner.ensure_connected()?;
        let reservation = inner.tracker.reserve("start_photo_interval")?;

        let weak = Arc::downgrade(inner);
        let worker = IntervalWorker::spawn(&inner.executor, period, move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => inner.interval_tick().await,
                    None => false,
                }
            }
        });
        reservation.commit(Activity::Interval(worker));

        info!("Photo interval started every {:?}", period);
        inner.publish_status();
        Ok(())
    }

    /// Cancel the photo interval. Succeeds without notification when none runs.
    pub fn stop_photo_interval(&self) -> Result<(), CameraError> {
        let inner = &self.inner;
        let Some((worker, reservation)) = inner.tracker.take_interval() else {
            debug!("No photo interval running");
            return Ok(());
        };

        worker.stop(&inner.executor, inner.executor.timeout());
        reservation.commit(Activity::Idle);

        info!("Photo interval stopped");
        inner.publish_status();
        Ok(())
    }

    /// Start recording, switching the camera to Video mode first if needed.
    /// If recording then fails to start, the previous mode is restored.
    pub fn start_video(&self) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        let reservation = inner.tracker.reserve("start_video")?;

        let previous = inner.tracker.mode();
        let mut mode_changed = previous != Mode::Video;
        if mode_changed {
            debug!("Switching to Video mode for recording");
            inner
                .executor
                .call("set_mode", |d| d.set_mode(DriverMode::Video))?;
            inner.tracker.set_mode(Mode::Video);
            inner.tracker.invalidate_settings();
        }

        let result = inner.executor.call("start_video", |d| d.start_video());
        match &result {
            Ok(()) => reservation.commit(Activity::Recording {
                started: Instant::now(),
            }),
            Err(_) => {
                if mode_changed && inner.restore_mode(previous) {
                    mode_changed = false;
                }
                drop(reservation);
            }
        }

        if mode_changed {
            inner.publish_mode();
            inner.publish_settings();
            inner.publish_setting_options();
        }
        result?;

        info!("Video recording started");
        inner.publish_status();
        Ok(())
    }

    /// Stop recording. Succeeds without notification when not recording.
    pub fn stop_video(&self) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        let Some((started, reservation)) = inner.tracker.take_recording()? else {
            debug!("No video recording running");
            return Ok(());
        };

        inner.executor.call("stop_video", |d| d.stop_video())?;
        let recording_time_s = started.elapsed().as_secs_f32();
        reservation.commit(Activity::Idle);

        info!("Video recording stopped after {:.1}s", recording_time_s);
        inner.subscriptions.status.notify_with(|| Status {
            recording_time_s,
            ..inner.tracker.status()
        });
        Ok(())
    }

    /// Start one video stream. Independent of recording.
    pub fn start_video_streaming(&self, stream_id: i32) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        if !inner.tracker.has_stream(stream_id) {
            return Err(CameraError::InvalidArgument(format!(
                "unknown video stream {}",
                stream_id
            )));
        }
        if inner.tracker.is_streaming(stream_id) {
            debug!("Video stream {} already running", stream_id);
            return Ok(());
        }

        inner
            .executor
            .call("start_video_streaming", move |d| d.start_video_streaming(stream_id))?;
        let infos = inner.tracker.set_streaming(stream_id, true);

        info!("Video stream {} started", stream_id);
        inner.subscriptions.video_stream_info.notify(infos);
        Ok(())
    }

    /// Stop one video stream. A stream that is not running is left alone.
    pub fn stop_video_streaming(&self, stream_id: i32) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        if !inner.tracker.is_streaming(stream_id) {
            debug!("Video stream {} not running", stream_id);
            return Ok(());
        }

        inner
            .executor
            .call("stop_video_streaming", move |d| d.stop_video_streaming(stream_id))?;
        let infos = inner.tracker.set_streaming(stream_id, false);

        info!("Video stream {} stopped", stream_id);
        inner.subscriptions.video_stream_info.notify(infos);
        Ok(())
    }

    /// Switch operating mode. Rejected with `Busy` while a session is active,
    /// unless the camera is already in `mode`.
    pub fn set_mode(&self, mode: Mode) -> Result<(), CameraError> {
        let Some(native) = mode.to_driver() else {
            return Err(CameraError::InvalidArgument(
                "cannot switch to Unknown mode".to_string(),
            ));
        };

        let inner = &self.inner;
        inner.ensure_connected()?;
        if inner.tracker.mode() == mode {
            debug!("Camera already in {:?} mode", mode);
            return Ok(());
        }

        {
            let _reservation = inner.tracker.reserve("set_mode")?;
            inner.executor.call("set_mode", move |d| d.set_mode(native))?;
            inner.tracker.set_mode(mode);
            inner.tracker.invalidate_settings();
        }

        info!("Camera mode set to {:?}", mode);
        inner.publish_mode();
        inner.publish_settings();
        inner.publish_setting_options();
        Ok(())
    }

    /// Captures in the storage index, oldest first. Indices are positions in
    /// the full index, so they agree between ranges.
    pub fn list_photos(&self, range: PhotosRange) -> Result<Vec<CaptureInfo>, CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;

        let mut captures = match inner.executor.run("list_captures", |d| d.list_captures())? {
            Ok(captures) => captures,
            Err(DriverStatus::Unsupported) => {
                return Err(CameraError::Unsupported(
                    "driver cannot list captures".to_string(),
                ))
            }
            Err(DriverStatus::NotAvailable) => return Err(CameraError::NotConnected),
            Err(status) => {
                warn!("Storage index unavailable: {}", status);
                return Err(CameraError::StorageUnavailable(status));
            }
        };
        captures.sort_by_key(|c| c.time_utc_us);

        let reference = match range {
            PhotosRange::All => None,
            PhotosRange::SinceConnection => inner.tracker.photo_reference_us(),
        };
        Ok(captures
            .iter()
            .enumerate()
            .filter(|(_, c)| reference.map_or(true, |r| c.time_utc_us >= r))
            .map(|(i, c)| CaptureInfo::from_native(c, i as i32))
            .collect())
    }

    pub fn mode_async(&self, callback: Option<Callback<Mode>>) {
        self.inner.subscriptions.mode.set(callback);
    }

    pub fn information_async(&self, callback: Option<Callback<Information>>) {
        self.inner.subscriptions.information.set(callback);
    }

    pub fn video_stream_info_async(&self, callback: Option<Callback<Vec<VideoStreamInfo>>>) {
        self.inner.subscriptions.video_stream_info.set(callback);
    }

    pub fn capture_info_async(&self, callback: Option<Callback<CaptureInfo>>) {
        self.inner.subscriptions.capture_info.set(callback);
    }

    pub fn status_async(&self, callback: Option<Callback<Status>>) {
        self.inner.subscriptions.status.set(callback);
    }

    pub fn current_settings_async(&self, callback: Option<Callback<Vec<Setting>>>) {
        self.inner.subscriptions.current_settings.set(callback);
    }

    pub fn possible_setting_options_async(
        &self,
        callback: Option<Callback<Vec<SettingOptions>>>,
    ) {
        self.inner.subscriptions.possible_setting_options.set(callback);
    }

    /// Current mode, `Unknown` before the first `prepare`
    pub fn mode(&self) -> Mode {
        self.inner.tracker.mode()
    }

    /// Camera description; the default value if none arrived in time
    pub fn information(&self) -> Information {
        self.inner
            .tracker
            .information
            .get(self.inner.config.poll_timeout())
            .unwrap_or_default()
    }

    pub fn video_stream_info(&self) -> Vec<VideoStreamInfo> {
        self.inner
            .tracker
            .stream_info
            .get(self.inner.config.poll_timeout())
            .unwrap_or_default()
    }

    /// Last completed capture; `index == -1` if none arrived in time
    pub fn capture_info(&self) -> CaptureInfo {
        self.inner
            .tracker
            .capture_info
            .get(self.inner.config.poll_timeout())
            .unwrap_or_default()
    }

    /// Capture and storage status. Waits for first storage data only while
    /// the driver is expected to report it.
    pub fn status(&self) -> Status {
        let inner = &self.inner;
        if inner.tracker.is_connected() && inner.tracker.storage_reported() {
            let _ = inner.tracker.storage().get(inner.config.poll_timeout());
        }
        inner.tracker.status()
    }

    /// Values of the settings applicable in the current mode
    pub fn current_settings(&self) -> Vec<Setting> {
        self.inner.settings_snapshot()
    }

    /// Option domains of the settings applicable in the current mode
    pub fn possible_setting_options(&self) -> Vec<SettingOptions> {
        self.inner
            .registry()
            .setting_options(self.inner.tracker.mode())
    }

    /// Write one setting. The value is validated before the driver is called.
    pub fn set_setting(&self, setting: &Setting) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;

        let registry = inner.registry();
        let binding = registry.applicable_binding(&setting.setting_id, inner.tracker.mode())?;
        let value = binding.encode(&setting.option.option_id)?;
        let parameter = binding.parameter.clone();

        debug!(
            "Setting {} to {} ({:?})",
            binding.id, setting.option.option_id, value
        );
        inner
            .executor
            .call("set_parameter", move |d| d.set_parameter(&parameter, value))?;
        inner.tracker.invalidate_settings();

        inner.publish_settings();
        Ok(())
    }

    /// Read one setting from the driver, in protocol form
    pub fn get_setting(&self, setting: &Setting) -> Result<Setting, CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;

        let registry = inner.registry();
        let binding = registry.binding(&setting.setting_id).ok_or_else(|| {
            CameraError::Unsupported(format!("unknown setting {}", setting.setting_id))
        })?;
        let parameter = binding.parameter.clone();

        let value = inner
            .executor
            .call("get_parameter", move |d| d.get_parameter(&parameter))?;
        Ok(binding.decode(value))
    }

    /// Erase a storage device known to the bridge
    pub fn format_storage(&self, storage_id: i32) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        if !inner.tracker.is_known_storage(storage_id) {
            warn!("Refusing to format unknown storage {}", storage_id);
            return Err(CameraError::InvalidArgument(format!(
                "unknown storage id {}",
                storage_id
            )));
        }

        info!("Formatting storage {}", storage_id);
        inner
            .executor
            .call("format_storage", move |d| d.format_storage(storage_id))?;
        inner.tracker.storage().clear();
        inner.refresh_storage();

        inner.publish_status();
        Ok(())
    }

    /// Switch to another camera endpoint and reload its state
    pub fn select_camera(&self, camera_id: i32) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        if !inner.executor.driver().camera_ids().contains(&camera_id) {
            return Err(CameraError::InvalidArgument(format!(
                "unknown camera id {}",
                camera_id
            )));
        }

        {
            let _reservation = inner.tracker.reserve("select_camera")?;
            inner
                .executor
                .call("select_camera", move |d| d.select_camera(camera_id))?;
            inner.refresh_mode();
            inner.refresh_information();
            inner.refresh_streams();
            inner.refresh_storage();
            inner.tracker.invalidate_settings();
        }

        info!("Camera {} selected", camera_id);
        inner.publish_mode();
        inner.publish_information();
        inner.publish_streams();
        inner.publish_status();
        inner.publish_settings();
        inner.publish_setting_options();
        Ok(())
    }

    /// Restore driver defaults and republish the full settings snapshot. A
    /// driver without a native reset gets the definition defaults written
    /// one by one.
    pub fn reset_settings(&self) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;

        match inner.executor.call("reset_settings", |d| d.reset_settings()) {
            Ok(()) => inner.tracker.invalidate_settings(),
            Err(CameraError::Unsupported(_)) => {
                debug!("Driver has no native reset, writing definition defaults");
                let restored = inner.apply_defaults();
                inner.tracker.invalidate_settings();
                restored?;
            }
            Err(e) => return Err(e),
        }

        info!("Camera settings reset");
        let settings = inner.settings_snapshot();
        inner.subscriptions.current_settings.notify(settings);
        Ok(())
    }

    /// Forward wall-clock time (UTC milliseconds) for media metadata
    pub fn set_timestamp(&self, timestamp_ms: i64) -> Result<(), CameraError> {
        let inner = &self.inner;
        inner.ensure_connected()?;
        inner
            .executor
            .call("set_timestamp", move |d| d.set_timestamp(timestamp_ms))
    }
}

impl Drop for CameraBridge {
    fn drop(&mut self) {
        self.close();
    }
}

impl BridgeInner {
    fn ensure_connected(&self) -> Result<(), CameraError> {
        if self.tracker.is_connected() {
            Ok(())
        } else {
            Err(CameraError::NotConnected)
        }
    }

    fn release_driver(&self) {
        if let Err(e) = self.executor.run("close", |d| {
            d.close();
            Ok(())
        }) {
            warn!("Driver close did not complete: {}", e);
        }
    }

    fn registry(&self) -> Arc<SettingsRegistry> {
        Arc::clone(&self.registry.read().unwrap_or_else(|e| e.into_inner()))
    }

    fn handle_event(&self, event: DriverEvent) {
        match event {
            DriverEvent::StorageUpdated(storage) => {
                debug!(
                    "Storage {} updated: {:.0}/{:.0} MiB used",
                    storage.storage_id, storage.used_mib, storage.total_mib
                );
                self.tracker.update_storage(storage);
                self.publish_status();
            }
            DriverEvent::CaptureCompleted(capture) => {
                let info = CaptureInfo::from_native(&capture, self.tracker.next_capture_index());
                debug!("Capture {} completed: {}", info.index, info.file_url);
                self.tracker.capture_info.set(info.clone());
                self.subscriptions.capture_info.notify(info);
            }
            DriverEvent::Disconnected => self.handle_disconnect(),
        }
    }

    fn handle_disconnect(&self) {
        if !self.tracker.is_connected() {
            return;
        }
        warn!("Camera driver disconnected");
        self.tracker.set_connected(false);
        // May run inside an interval tick, so only signal the worker.
        if let Some(worker) = self.tracker.clear_sessions() {
            worker.cancel();
        }
        self.publish_status();
        self.publish_streams();
    }

    /// One photo-interval capture. Returns false to end the interval.
    async fn interval_tick(&self) -> bool {
        if !self.tracker.is_connected() {
            return false;
        }
        match self.executor.call_async("take_photo", |d| d.take_photo()).await {
            Ok(()) => true,
            Err(CameraError::NotConnected) => false,
            Err(e) => {
                warn!("Interval capture failed: {}", e);
                true
            }
        }
    }

    /// Switch the camera back to `mode` after a failed operation moved it away
    fn restore_mode(&self, mode: Mode) -> bool {
        let Some(native) = mode.to_driver() else {
            return false;
        };
        match self.executor.call("set_mode", move |d| d.set_mode(native)) {
            Ok(()) => {
                debug!("Camera mode restored to {:?}", mode);
                self.tracker.set_mode(mode);
                self.tracker.invalidate_settings();
                true
            }
            Err(e) => {
                warn!("Could not restore {:?} mode: {}", mode, e);
                false
            }
        }
    }

    /// Write every definition default, for drivers without a native reset
    fn apply_defaults(&self) -> Result<(), CameraError> {
        let registry = self.registry();
        let mut restored = 0usize;

        for binding in registry.iter() {
            let Some(value) = binding.default_value() else {
                continue;
            };
            let parameter = binding.parameter.clone();
            match self
                .executor
                .call("set_parameter", move |d| d.set_parameter(&parameter, value))
            {
                Ok(()) => restored += 1,
                Err(CameraError::Unsupported(_)) => {
                    debug!("Driver does not accept {}, left as is", binding.id)
                }
                Err(e) => return Err(e),
            }
        }

        if restored == 0 {
            return Err(CameraError::Unsupported(
                "driver cannot reset settings".to_string(),
            ));
        }
        info!("Restored {} settings to definition defaults", restored);
        Ok(())
    }

    fn refresh_mode(&self) {
        match self.executor.call("mode", |d| d.mode()) {
            Ok(mode) => self.tracker.set_mode(mode.into()),
            Err(e) => warn!("Could not read camera mode: {}", e),
        }
    }

    fn refresh_information(&self) {
        match self.executor.call("information", |d| d.information()) {
            Ok(info) => self.tracker.information.set(info.into()),
            Err(e) => debug!("Camera information not available: {}", e),
        }
    }

    fn refresh_streams(&self) {
        match self.executor.call("video_streams", |d| d.video_streams()) {
            Ok(streams) => {
                debug!("Camera offers {} video streams", streams.len());
                self.tracker.set_streams(streams);
            }
            Err(e) => debug!("Video streams not available: {}", e),
        }
    }

    fn refresh_storage(&self) {
        match self.executor.call("storage_devices", |d| d.storage_devices()) {
            Ok(devices) => {
                self.tracker.set_storage_reported(true);
                self.tracker.set_storage_devices(&devices);
            }
            Err(e) => {
                debug!("Storage information not available: {}", e);
                self.tracker.set_storage_reported(false);
            }
        }
    }

    /// Current settings for the tracked mode, from the cache or read back
    /// from the driver. Incomplete reads are returned but not cached.
    fn settings_snapshot(&self) -> Vec<Setting> {
        let mode = self.tracker.mode();
        let generation = match self.tracker.cached_settings(mode) {
            Ok(settings) => return settings,
            Err(generation) => generation,
        };
        if !self.tracker.is_connected() {
            return Vec::new();
        }

        let registry = self.registry();
        let mut settings = Vec::new();
        let mut complete = true;
        for binding in registry.applicable(mode) {
            let parameter = binding.parameter.clone();
            match self
                .executor
                .call("get_parameter", move |d| d.get_parameter(&parameter))
            {
                Ok(value) => settings.push(binding.decode(value)),
                Err(CameraError::Unsupported(_)) => {
                    debug!("Driver does not report {}", binding.id)
                }
                Err(e @ (CameraError::Timeout | CameraError::NotConnected)) => {
                    warn!("Settings snapshot aborted: {}", e);
                    complete = false;
                    break;
                }
                Err(e) => {
                    warn!("Could not read {}: {}", binding.id, e);
                    complete = false;
                }
            }
        }

        if complete {
            self.tracker.store_settings(generation, mode, settings.clone());
        }
        settings
    }

    fn publish_mode(&self) {
        self.subscriptions.mode.notify(self.tracker.mode());
    }

    fn publish_information(&self) {
        if let Some(info) = self.tracker.information.peek() {
            self.subscriptions.information.notify(info);
        }
    }

    fn publish_streams(&self) {
        self.subscriptions
            .video_stream_info
            .notify_with(|| self.tracker.stream_infos());
    }

    fn publish_status(&self) {
        self.subscriptions
            .status
            .notify_with(|| self.tracker.status());
    }

    fn publish_settings(&self) {
        self.subscriptions
            .current_settings
            .notify_with(|| self.settings_snapshot());
    }

    fn publish_setting_options(&self) {
        self.subscriptions
            .possible_setting_options
            .notify_with(|| self.registry().setting_options(self.tracker.mode()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_driver::SimulatedDriver;

    fn bridge() -> (SimulatedDriver, CameraBridge) {
        let sim = SimulatedDriver::new();
        let bridge = CameraBridge::new(Arc::new(sim.clone()), BridgeConfig::fast()).unwrap();
        (sim, bridge)
    }

    #[test]
    fn test_commands_need_prepare() {
        let (sim, bridge) = bridge();
        assert_eq!(bridge.take_photo(), Err(CameraError::NotConnected));
        assert_eq!(bridge.set_mode(Mode::Video), Err(CameraError::NotConnected));
        assert_eq!(sim.calls("take_photo"), 0);
        assert!(bridge.current_settings().is_empty());
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let (sim, bridge) = bridge();
        bridge.prepare().unwrap();
        bridge.prepare().unwrap();
        assert_eq!(sim.calls("open"), 1);
        assert_eq!(bridge.mode(), Mode::Photo);
        assert!(bridge.is_connected());
    }

    #[test]
    fn test_prepare_unavailable_driver() {
        let sim = SimulatedDriver::unavailable();
        let bridge = CameraBridge::new(Arc::new(sim), BridgeConfig::fast()).unwrap();
        assert_eq!(bridge.prepare(), Err(CameraError::DriverUnavailable));
        assert!(!bridge.is_connected());
    }

    #[test]
    fn test_prepare_driver_failure() {
        let (sim, bridge) = bridge();
        sim.fail("open", DriverStatus::Failed);
        assert_eq!(
            bridge.prepare(),
            Err(CameraError::InitializationFailed(DriverStatus::Failed))
        );
    }

    #[test]
    fn test_set_mode_unknown_rejected() {
        let (_sim, bridge) = bridge();
        bridge.prepare().unwrap();
        assert!(matches!(
            bridge.set_mode(Mode::Unknown),
            Err(CameraError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let (sim, bridge) = bridge();
        bridge.prepare().unwrap();
        bridge.close();
        bridge.close();
        assert_eq!(sim.calls("close"), 1);
        assert_eq!(bridge.take_photo(), Err(CameraError::NotConnected));
    }

    #[test]
    fn test_interval_period_validated() {
        let (_sim, bridge) = bridge();
        bridge.prepare().unwrap();
        for period in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                bridge.start_photo_interval(period),
                Err(CameraError::InvalidArgument(_))
            ));
        }
    }
}
