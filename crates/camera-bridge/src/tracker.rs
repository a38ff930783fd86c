//! State Tracker
//!
//! Holds mode, session activity, stream flags and caches. Every structure has
//! its own lock, held only for a read-modify-write and never across a driver
//! call. The storage cache is locked separately because driver storage
//! refreshes arrive independently of commands.

use crate::error::CameraError;
use crate::interval::IntervalWorker;
use crate::types::{Information, Mode, Setting, Status, VideoStreamInfo};
use camera_driver::{StorageInformation, StreamDescriptor};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

/// Latest value of a category, with a bounded wait for the first value
pub struct Latest<T> {
    value: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T: Clone> Latest<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    pub fn set(&self, value: T) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = Some(value);
        self.ready.notify_all();
    }

    pub fn clear(&self) {
        *self.value.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Current value without waiting
    pub fn peek(&self) -> Option<T> {
        self.value.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Current value, waiting up to `timeout` for a first one
    pub fn get(&self, timeout: Duration) -> Option<T> {
        let guard = self.value.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .ready
            .wait_timeout_while(guard, timeout, |v| v.is_none())
            .unwrap_or_else(|e| e.into_inner());
        guard.clone()
    }
}

impl<T: Clone> Default for Latest<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// What the capture pipeline is doing
pub enum Activity {
    Idle,
    /// An operation holds the slot while it talks to the driver
    Transition(&'static str),
    Interval(IntervalWorker),
    Recording { started: Instant },
}

impl Activity {
    fn busy_reason(&self) -> Option<&'static str> {
        match self {
            Activity::Idle => None,
            Activity::Transition(op) => Some(*op),
            Activity::Interval(_) => Some("photo interval active"),
            Activity::Recording { .. } => Some("video recording active"),
        }
    }
}

struct Session {
    mode: Mode,
    activity: Activity,
    streams: Vec<StreamDescriptor>,
    streaming: HashSet<i32>,
    capture_index: i32,
    photo_reference_us: Option<u64>,
    /// Bumped whenever sessions are cleared underneath in-flight operations
    epoch: u64,
}

/// Claim on the activity slot. Dropping it without `commit` restores the
/// activity that was there before the claim. If sessions were cleared while
/// the claim was held, both paths leave the slot idle.
pub struct Reservation<'a> {
    tracker: &'a StateTracker,
    restore: Option<Activity>,
    epoch: u64,
}

impl Reservation<'_> {
    /// Install the activity the operation produced
    pub fn commit(mut self, activity: Activity) {
        self.restore = None;
        let mut session = self.tracker.session();
        if session.epoch == self.epoch {
            session.activity = activity;
            return;
        }
        session.activity = Activity::Idle;
        drop(session);
        if let Activity::Interval(worker) = activity {
            worker.cancel();
        }
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.restore.take() {
            let mut session = self.tracker.session();
            session.activity = if session.epoch == self.epoch {
                previous
            } else {
                Activity::Idle
            };
        }
    }
}

/// Settings snapshot tagged with the mode it was read in. The generation
/// counter rejects snapshots read before the latest invalidation.
struct SettingsCache {
    generation: u64,
    snapshot: Option<(Mode, Vec<Setting>)>,
}

/// Camera state shared between commands and driver events
pub struct StateTracker {
    connected: AtomicBool,
    session: Mutex<Session>,
    storage: Latest<StorageInformation>,
    storage_ids: Mutex<Vec<i32>>,
    /// Cleared when the driver cannot enumerate storage
    storage_reported: AtomicBool,
    settings: RwLock<SettingsCache>,
    pub information: Latest<Information>,
    pub capture_info: Latest<crate::types::CaptureInfo>,
    pub stream_info: Latest<Vec<VideoStreamInfo>>,
}

impl StateTracker {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            session: Mutex::new(Session {
                mode: Mode::Unknown,
                activity: Activity::Idle,
                streams: Vec::new(),
                streaming: HashSet::new(),
                capture_index: 0,
                photo_reference_us: None,
                epoch: 0,
            }),
            storage: Latest::new(),
            storage_ids: Mutex::new(Vec::new()),
            storage_reported: AtomicBool::new(true),
            settings: RwLock::new(SettingsCache {
                generation: 0,
                snapshot: None,
            }),
            information: Latest::new(),
            capture_info: Latest::new(),
            stream_info: Latest::new(),
        }
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn mode(&self) -> Mode {
        self.session().mode
    }

    pub fn set_mode(&self, mode: Mode) {
        self.session().mode = mode;
    }

    /// Claim the idle activity slot for `operation`
    pub fn reserve(&self, operation: &'static str) -> Result<Reservation<'_>, CameraError> {
        let mut session = self.session();
        if let Some(reason) = session.activity.busy_reason() {
            return Err(CameraError::Busy(reason));
        }
        session.activity = Activity::Transition(operation);
        Ok(Reservation {
            tracker: self,
            restore: Some(Activity::Idle),
            epoch: session.epoch,
        })
    }

    /// Take the running interval worker out of the slot. `None` when no
    /// interval is running.
    pub fn take_interval(&self) -> Option<(IntervalWorker, Reservation<'_>)> {
        let mut session = self.session();
        if !matches!(session.activity, Activity::Interval(_)) {
            return None;
        }
        let previous = std::mem::replace(
            &mut session.activity,
            Activity::Transition("stop_photo_interval"),
        );
        let epoch = session.epoch;
        drop(session);

        match previous {
            Activity::Interval(worker) => Some((
                worker,
                Reservation {
                    tracker: self,
                    restore: Some(Activity::Idle),
                    epoch,
                },
            )),
            _ => None,
        }
    }

    /// Claim a running recording for stopping. Dropping the reservation puts
    /// the recording back.
    pub fn take_recording(&self) -> Result<Option<(Instant, Reservation<'_>)>, CameraError> {
        let mut session = self.session();
        let started = match &session.activity {
            Activity::Recording { started } => *started,
            Activity::Transition(op) => return Err(CameraError::Busy(*op)),
            Activity::Idle | Activity::Interval(_) => return Ok(None),
        };
        session.activity = Activity::Transition("stop_video");

        Ok(Some((
            started,
            Reservation {
                tracker: self,
                restore: Some(Activity::Recording { started }),
                epoch: session.epoch,
            },
        )))
    }

    /// Clear every session: used on close and on driver loss. Returns the
    /// interval worker, if one was running, for the caller to stop.
    pub fn clear_sessions(&self) -> Option<IntervalWorker> {
        let mut session = self.session();
        session.streaming.clear();
        session.epoch += 1;
        match std::mem::replace(&mut session.activity, Activity::Idle) {
            Activity::Interval(worker) => Some(worker),
            Activity::Idle | Activity::Transition(_) | Activity::Recording { .. } => None,
        }
    }

    /// Protocol index for the next completed capture
    pub fn next_capture_index(&self) -> i32 {
        let mut session = self.session();
        let index = session.capture_index;
        session.capture_index += 1;
        index
    }

    /// Start a connection: reset capture indices and, if requested or unset,
    /// move the photo reference point to `now_us`.
    pub fn begin_connection(&self, now_us: u64, reset_reference: bool) {
        let mut session = self.session();
        session.capture_index = 0;
        if reset_reference || session.photo_reference_us.is_none() {
            session.photo_reference_us = Some(now_us);
        }
    }

    pub fn photo_reference_us(&self) -> Option<u64> {
        self.session().photo_reference_us
    }

    /// Replace the known stream list, keeping running flags of streams that remain
    pub fn set_streams(&self, streams: Vec<StreamDescriptor>) -> Vec<VideoStreamInfo> {
        let mut session = self.session();
        let ids: HashSet<i32> = streams.iter().map(|s| s.stream_id).collect();
        session.streaming.retain(|id| ids.contains(id));
        session.streams = streams;
        let infos = Self::stream_infos_locked(&session);
        drop(session);
        self.stream_info.set(infos.clone());
        infos
    }

    pub fn has_stream(&self, stream_id: i32) -> bool {
        self.session()
            .streams
            .iter()
            .any(|s| s.stream_id == stream_id)
    }

    pub fn is_streaming(&self, stream_id: i32) -> bool {
        self.session().streaming.contains(&stream_id)
    }

    /// Record a stream as running or stopped
    pub fn set_streaming(&self, stream_id: i32, running: bool) -> Vec<VideoStreamInfo> {
        let mut session = self.session();
        if running {
            session.streaming.insert(stream_id);
        } else {
            session.streaming.remove(&stream_id);
        }
        let infos = Self::stream_infos_locked(&session);
        drop(session);
        self.stream_info.set(infos.clone());
        infos
    }

    pub fn stream_infos(&self) -> Vec<VideoStreamInfo> {
        Self::stream_infos_locked(&self.session())
    }

    fn stream_infos_locked(session: &Session) -> Vec<VideoStreamInfo> {
        session
            .streams
            .iter()
            .map(|s| VideoStreamInfo::from_native(s, session.streaming.contains(&s.stream_id)))
            .collect()
    }

    pub fn storage(&self) -> &Latest<StorageInformation> {
        &self.storage
    }

    /// Record the driver's storage devices; the first becomes the active one
    pub fn set_storage_devices(&self, devices: &[StorageInformation]) {
        *self.storage_ids.lock().unwrap_or_else(|e| e.into_inner()) =
            devices.iter().map(|d| d.storage_id).collect();
        match devices.first() {
            Some(active) => self.storage.set(active.clone()),
            None => self.storage.clear(),
        }
    }

    /// Whether storage data can be expected from the driver
    pub fn storage_reported(&self) -> bool {
        self.storage_reported.load(Ordering::SeqCst)
    }

    pub fn set_storage_reported(&self, reported: bool) {
        self.storage_reported.store(reported, Ordering::SeqCst);
    }

    /// Apply a driver storage refresh
    pub fn update_storage(&self, storage: StorageInformation) {
        {
            let mut ids = self.storage_ids.lock().unwrap_or_else(|e| e.into_inner());
            if !ids.contains(&storage.storage_id) {
                ids.push(storage.storage_id);
            }
        }
        self.storage_reported.store(true, Ordering::SeqCst);
        self.storage.set(storage);
    }

    pub fn is_known_storage(&self, storage_id: i32) -> bool {
        self.storage_ids
            .lock()
            .map(|ids| ids.contains(&storage_id))
            .unwrap_or(false)
    }

    /// Consistent Status snapshot. Session and storage are read under their
    /// own locks, one after the other, never nested.
    pub fn status(&self) -> Status {
        let mut status = {
            let session = self.session();
            let (video_on, recording_time_s) = match &session.activity {
                Activity::Recording { started } => (true, started.elapsed().as_secs_f32()),
                _ => (false, 0.0),
            };
            Status {
                video_on,
                photo_interval_on: matches!(session.activity, Activity::Interval(_)),
                recording_time_s,
                ..Default::default()
            }
        };
        if let Some(storage) = self.storage.peek() {
            status.apply_storage(&storage);
        }
        status
    }

    /// Drop the settings snapshot
    pub fn invalidate_settings(&self) {
        let mut cache = self.settings.write().unwrap_or_else(|e| e.into_inner());
        cache.generation += 1;
        cache.snapshot = None;
    }

    /// Snapshot for `mode`, if still valid, else the generation to rebuild against
    pub fn cached_settings(&self, mode: Mode) -> Result<Vec<Setting>, u64> {
        let cache = self.settings.read().unwrap_or_else(|e| e.into_inner());
        match &cache.snapshot {
            Some((cached_mode, settings)) if *cached_mode == mode => Ok(settings.clone()),
            _ => Err(cache.generation),
        }
    }

    /// Store a rebuilt snapshot unless it was invalidated meanwhile
    pub fn store_settings(&self, generation: u64, mode: Mode, settings: Vec<Setting>) -> bool {
        let mut cache = self.settings.write().unwrap_or_else(|e| e.into_inner());
        if cache.generation != generation {
            return false;
        }
        cache.snapshot = Some((mode, settings));
        true
    }
}

impl Default for StateTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_reservation_restores_idle() {
        let tracker = StateTracker::new();
        {
            let _reservation = tracker.reserve("take_photo").unwrap();
            assert!(matches!(tracker.reserve("take_photo"), Err(CameraError::Busy(_))));
        }
        assert!(tracker.reserve("take_photo").is_ok());
    }

    #[test]
    fn test_commit_recording() {
        let tracker = StateTracker::new();
        let reservation = tracker.reserve("start_video").unwrap();
        reservation.commit(Activity::Recording {
            started: Instant::now(),
        });
        assert!(tracker.status().video_on);
        assert!(matches!(
            tracker.reserve("start_photo_interval"),
            Err(CameraError::Busy("video recording active"))
        ));
    }

    #[test]
    fn test_failed_stop_keeps_recording() {
        let tracker = StateTracker::new();
        tracker.reserve("start_video").unwrap().commit(Activity::Recording {
            started: Instant::now(),
        });

        let (_, reservation) = tracker.take_recording().unwrap().unwrap();
        assert!(!tracker.status().video_on);
        drop(reservation);
        assert!(tracker.status().video_on);
    }

    #[test]
    fn test_cleared_sessions_win_over_reservation() {
        let tracker = StateTracker::new();
        tracker.reserve("start_video").unwrap().commit(Activity::Recording {
            started: Instant::now(),
        });

        let (_, reservation) = tracker.take_recording().unwrap().unwrap();
        assert!(tracker.clear_sessions().is_none());
        drop(reservation);
        assert!(!tracker.status().video_on);
        assert!(tracker.reserve("take_photo").is_ok());
    }

    #[test]
    fn test_take_recording_when_idle() {
        let tracker = StateTracker::new();
        assert!(tracker.take_recording().unwrap().is_none());
    }

    #[test]
    fn test_latest_times_out() {
        let latest: Latest<i32> = Latest::new();
        let started = Instant::now();
        assert_eq!(latest.get(Duration::from_millis(50)), None);
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_latest_wakes_waiter() {
        let latest: Arc<Latest<i32>> = Arc::new(Latest::new());
        let writer = latest.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            writer.set(7);
        });
        assert_eq!(latest.get(Duration::from_secs(2)), Some(7));
        handle.join().unwrap();
    }

    #[test]
    fn test_stale_settings_snapshot_rejected() {
        let tracker = StateTracker::new();
        let generation = tracker.cached_settings(Mode::Photo).unwrap_err();
        tracker.invalidate_settings();
        assert!(!tracker.store_settings(generation, Mode::Photo, Vec::new()));

        let generation = tracker.cached_settings(Mode::Photo).unwrap_err();
        assert!(tracker.store_settings(generation, Mode::Photo, Vec::new()));
        assert!(tracker.cached_settings(Mode::Photo).is_ok());
        assert!(tracker.cached_settings(Mode::Video).is_err());
    }

    #[test]
    fn test_unknown_storage_rejected() {
        let tracker = StateTracker::new();
        tracker.set_storage_devices(&[StorageInformation {
            storage_id: 1,
            ..Default::default()
        }]);
        assert!(tracker.is_known_storage(1));
        assert!(!tracker.is_known_storage(2));
    }
}
