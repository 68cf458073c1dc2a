//! Native event construction and posting.
//!
//! An [`EventBackend`] builds low-level events and posts them either to one
//! process or to the system-wide input stream. Posting is fire-and-forget:
//! nothing is confirmed or rolled back.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::{DispatchError, Result};
use crate::event::LowLevelEvent;
use crate::key_code::Key;

/// Host keyboard-event service.
pub trait EventBackend {
    /// Builds a low-level event. `None` means the host refused it.
    fn create_event(&self, key: Key, flags: u64, key_down: bool) -> Option<LowLevelEvent>;

    /// Posts to the event queue of a single process.
    fn post_to_process(&self, event: &LowLevelEvent, pid: u32) -> Result<()>;

    /// Posts to the system-wide input stream.
    fn post_globally(&self, event: &LowLevelEvent) -> Result<()>;
}

impl<B: EventBackend + ?Sized> EventBackend for Arc<B> {
    fn create_event(&self, key: Key, flags: u64, key_down: bool) -> Option<LowLevelEvent> {
        (**self).create_event(key, flags, key_down)
    }

    fn post_to_process(&self, event: &LowLevelEvent, pid: u32) -> Result<()> {
        (**self).post_to_process(event, pid)
    }

    fn post_globally(&self, event: &LowLevelEvent) -> Result<()> {
        (**self).post_globally(event)
    }
}

/// Where a recorded event was posted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostTarget {
    Process(u32),
    Global,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedEvent {
    pub target: PostTarget,
    pub event: LowLevelEvent,
}

/// Host object attached by [`RecordingBackend`]: the construction serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedNative {
    pub serial: usize,
}

/// In-memory backend that records every post instead of delivering it.
///
/// Refuses keycodes missing from the key table, any key marked with
/// [`RecordingBackend::refuse_key`], and everything while `refuse_all` is set.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    posted: Mutex<Vec<PostedEvent>>,
    refused: Mutex<HashSet<Key>>,
    refuse_all: AtomicBool,
    created: AtomicUsize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_key(&self, key: Key) {
        self.refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
    }

    pub fn set_refuse_all(&self, refuse: bool) {
        self.refuse_all.store(refuse, Ordering::Relaxed);
    }

    /// Number of events successfully constructed so far.
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn posted(&self) -> Vec<PostedEvent> {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn record(&self, target: PostTarget, event: &LowLevelEvent) {
        self.posted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PostedEvent {
                target,
                event: event.clone(),
            });
    }
}

impl EventBackend for RecordingBackend {
    fn create_event(&self, key: Key, flags: u64, key_down: bool) -> Option<LowLevelEvent> {
        if self.refuse_all.load(Ordering::Relaxed) || !key.is_known() {
            return None;
        }
        if self
            .refused
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&key)
        {
            return None;
        }
        let serial = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        Some(
            LowLevelEvent::new(key, flags, key_down)
                .with_native(Arc::new(RecordedNative { serial })),
        )
    }

    fn post_to_process(&self, event: &LowLevelEvent, pid: u32) -> Result<()> {
        self.record(PostTarget::Process(pid), event);
        Ok(())
    }

    fn post_globally(&self, event: &LowLevelEvent) -> Result<()> {
        self.record(PostTarget::Global, event);
        Ok(())
    }
}

/// Converts a PID to the host's signed `pid_t`.
#[cfg_attr(not(target_os = "macos"), allow(dead_code))]
pub(crate) fn native_pid(pid: u32) -> Result<i32> {
    i32::try_from(pid)
        .map_err(|_| DispatchError::post_failed(format!("pid {pid} is out of range for pid_t")))
}

#[cfg(target_os = "macos")]
pub use quartz::QuartzBackend;

#[cfg(target_os = "macos")]
mod quartz {
    use std::sync::Arc;

    use core_graphics::event::{CGEvent, CGEventFlags, CGEventTapLocation};
    use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};
    use tracing::trace;

    use super::{native_pid, EventBackend};
    use crate::error::{DispatchError, Result};
    use crate::event::LowLevelEvent;
    use crate::key_code::Key;

    /// A `CGEvent` kept alive inside a cached [`LowLevelEvent`].
    struct QuartzEvent(CGEvent);

    // SAFETY: the wrapped event is never mutated after `set_flags`, and
    // CFRetain/CFRelease on it are thread-safe.
    unsafe impl Send for QuartzEvent {}
    unsafe impl Sync for QuartzEvent {}

    /// Quartz Event Services backend.
    ///
    /// Posting requires the Accessibility permission
    /// (System Settings > Privacy & Security > Accessibility).
    #[derive(Debug, Clone, Copy, Default)]
    pub struct QuartzBackend;

    impl QuartzBackend {
        pub fn new() -> Self {
            Self
        }

        fn native(key: Key, flags: u64, key_down: bool) -> Option<CGEvent> {
            let source = CGEventSource::new(CGEventSourceStateID::HIDSystemState).ok()?;
            let event = CGEvent::new_keyboard_event(source, key.code(), key_down).ok()?;
            event.set_flags(CGEventFlags::from_bits_truncate(flags));
            Some(event)
        }

        /// The `CGEvent` built for this event, or a new one for events
        /// that arrived without it.
        fn native_for(event: &LowLevelEvent) -> Result<CGEvent> {
            if let Some(QuartzEvent(native)) = event.native::<QuartzEvent>() {
                return Ok(native.clone());
            }
            Self::native(event.key(), event.flags(), event.is_key_down()).ok_or_else(|| {
                DispatchError::construction_failed(event.key(), event.modifiers(), event.kind())
            })
        }
    }

    impl EventBackend for QuartzBackend {
        fn create_event(&self, key: Key, flags: u64, key_down: bool) -> Option<LowLevelEvent> {
            Self::native(key, flags, key_down).map(|native| {
                LowLevelEvent::new(key, flags, key_down).with_native(Arc::new(QuartzEvent(native)))
            })
        }

        fn post_to_process(&self, event: &LowLevelEvent, pid: u32) -> Result<()> {
            let pid = native_pid(pid)?;
            let native = Self::native_for(event)?;
            trace!(pid, key = %event.key(), "posting to process");
            native.post_to_pid(pid);
            Ok(())
        }

        fn post_globally(&self, event: &LowLevelEvent) -> Result<()> {
            let native = Self::native_for(event)?;
            trace!(key = %event.key(), "posting to HID tap");
            native.post(CGEventTapLocation::HID);
            Ok(())
        }
    }
}

/// The native backend for this platform.
pub fn default_backend() -> Result<Box<dyn EventBackend>> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(QuartzBackend::new()))
    }

    #[cfg(not(target_os = "macos"))]
    {
        Err(DispatchError::unsupported_platform(
            "native key events are only implemented for macOS; use a dry run elsewhere",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_backend_records_targets() {
        let backend = RecordingBackend::new();
        let event = backend.create_event(Key::A, 0, true).unwrap();
        backend.post_to_process(&event, 42).unwrap();
        backend.post_globally(&event).unwrap();

        let posted = backend.posted();
        assert_eq!(posted.len(), 2);
        assert_eq!(posted[0].target, PostTarget::Process(42));
        assert_eq!(posted[1].target, PostTarget::Global);
        assert_eq!(posted[1].event, event);

        backend.clear();
        assert!(backend.posted().is_empty());
    }

    #[test]
    fn test_recording_backend_refusals() {
        let backend = RecordingBackend::new();
        assert!(backend.create_event(Key::from_code(0x7F), 0, true).is_none());

        backend.refuse_key(Key::B);
        assert!(backend.create_event(Key::B, 0, true).is_none());
        assert!(backend.create_event(Key::C, 0, true).is_some());

        backend.set_refuse_all(true);
        assert!(backend.create_event(Key::C, 0, true).is_none());
        assert_eq!(backend.created_count(), 1);
    }

    #[test]
    fn test_recording_backend_attaches_serial() {
        let backend = RecordingBackend::new();
        let first = backend.create_event(Key::A, 0, true).unwrap();
        let second = backend.create_event(Key::A, 0, true).unwrap();
        assert_eq!(first.native::<RecordedNative>(), Some(&RecordedNative { serial: 1 }));
        assert_eq!(second.native::<RecordedNative>(), Some(&RecordedNative { serial: 2 }));

        backend.post_globally(&second).unwrap();
        assert_eq!(
            backend.posted()[0].event.native::<RecordedNative>(),
            Some(&RecordedNative { serial: 2 })
        );
    }

    #[test]
    fn test_native_pid_range() {
        assert_eq!(native_pid(501).unwrap(), 501);
        assert_eq!(native_pid(i32::MAX as u32).unwrap(), i32::MAX);
        assert!(matches!(
            native_pid(u32::MAX),
            Err(DispatchError::PostFailed(_))
        ));
        assert!(native_pid(1 << 31).is_err());
    }
}
