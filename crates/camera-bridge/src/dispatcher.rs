//! Subscription Dispatcher
//!
//! One callback slot per event category. Installing a callback replaces the
//! previous one, `None` clears the slot, and a notification for an empty slot
//! is dropped.

use crate::types::{CaptureInfo, Information, Mode, Setting, SettingOptions, Status, VideoStreamInfo};
use std::sync::{Arc, Mutex};

/// Subscriber callback for values of type `T`
pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A single replaceable callback slot
pub struct Slot<T> {
    callback: Mutex<Option<Callback<T>>>,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            callback: Mutex::new(None),
        }
    }

    /// Install or clear the callback
    pub fn set(&self, callback: Option<Callback<T>>) {
        *self.callback.lock().unwrap_or_else(|e| e.into_inner()) = callback;
    }

    pub fn is_set(&self) -> bool {
        self.callback
            .lock()
            .map(|c| c.is_some())
            .unwrap_or(false)
    }

    /// Deliver `value` on the calling thread. The slot lock is released before
    /// the callback runs, so a callback may resubscribe or call back into the
    /// bridge.
    pub fn notify(&self, value: T) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(value);
        }
    }

    /// Deliver a value built lazily, only when someone is listening
    pub fn notify_with(&self, build: impl FnOnce() -> T) {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(callback) = callback {
            callback(build());
        }
    }
}

/// Callback slots of every event category
pub struct Subscriptions {
    pub mode: Slot<Mode>,
    pub information: Slot<Information>,
    pub video_stream_info: Slot<Vec<VideoStreamInfo>>,
    pub capture_info: Slot<CaptureInfo>,
    pub status: Slot<Status>,
    pub current_settings: Slot<Vec<Setting>>,
    pub possible_setting_options: Slot<Vec<SettingOptions>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self {
            mode: Slot::new(),
            information: Slot::new(),
            video_stream_info: Slot::new(),
            capture_info: Slot::new(),
            status: Slot::new(),
            current_settings: Slot::new(),
            possible_setting_options: Slot::new(),
        }
    }
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_slot_drops() {
        let slot: Slot<Mode> = Slot::new();
        slot.notify(Mode::Photo);
        assert!(!slot.is_set());
    }

    #[test]
    fn test_last_writer_wins() {
        let slot: Slot<Mode> = Slot::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let f = first.clone();
        slot.set(Some(Arc::new(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        })));
        let s = second.clone();
        slot.set(Some(Arc::new(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        })));

        slot.notify(Mode::Video);
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        slot.set(None);
        slot.notify(Mode::Video);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_resubscribe() {
        let slot: Arc<Slot<Mode>> = Arc::new(Slot::new());
        let inner = slot.clone();
        slot.set(Some(Arc::new(move |_| inner.set(None))));
        slot.notify(Mode::Photo);
        assert!(!slot.is_set());
    }

    #[test]
    fn test_lazy_value_not_built_without_subscriber() {
        let slot: Slot<Vec<Setting>> = Slot::new();
        slot.notify_with(|| panic!("built without subscriber"));
    }
}
