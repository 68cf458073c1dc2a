//! Key events and their native encodings.
//!
//! A [`KeyEvent`] is the immutable triple `(key, modifiers, kind)` plus a
//! cache of native encodings built on demand:
//!
//! - *storage*: only the triple, nothing built yet;
//! - *low-level*: a [`LowLevelEvent`], the form posted to a process or to
//!   the global input stream;
//! - *high-level*: a [`HighLevelEvent`], derived from the low-level one and
//!   keeping it, so the low-level form stays reachable.
//!
//! The cache only ever upgrades. Equality and hashing look at the triple
//! alone, never at what happens to be cached.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::backend::EventBackend;
use crate::error::{DispatchError, Result};
use crate::key_code::Key;
use crate::modifiers::{event_flags, ModifierSet};

/// Kind of keyboard event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventKind {
    KeyDown,
    KeyUp,
    /// Down immediately followed by up. Has no native encoding of its own.
    KeyPress,
}

impl EventKind {
    /// The natively encodable kinds this kind stands for.
    pub fn expand(self) -> &'static [EventKind] {
        match self {
            EventKind::KeyDown => &[EventKind::KeyDown],
            EventKind::KeyUp => &[EventKind::KeyUp],
            EventKind::KeyPress => &[EventKind::KeyDown, EventKind::KeyUp],
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::KeyDown => "keyDown",
            EventKind::KeyUp => "keyUp",
            EventKind::KeyPress => "keyPress",
        };
        f.write_str(name)
    }
}

impl FromStr for EventKind {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "down" | "keydown" => Ok(EventKind::KeyDown),
            "up" | "keyup" => Ok(EventKind::KeyUp),
            "press" | "keypress" => Ok(EventKind::KeyPress),
            _ => Err(DispatchError::config_validation(format!(
                "unknown event kind '{s}' (expected down, up or press)"
            ))),
        }
    }
}

/// Host object backing a [`LowLevelEvent`], such as a retained `CGEvent`.
pub type NativeHandle = Arc<dyn Any + Send + Sync>;

/// Native event as posted to a process or the global input stream.
///
/// Backends attach the host object they built as a [`NativeHandle`] so that
/// posting a cached event reuses it instead of constructing a new one.
#[derive(Clone)]
pub struct LowLevelEvent {
    key: Key,
    flags: u64,
    key_down: bool,
    native: Option<NativeHandle>,
}

impl LowLevelEvent {
    pub fn new(key: Key, flags: u64, key_down: bool) -> Self {
        Self {
            key,
            flags,
            key_down,
            native: None,
        }
    }

    /// Attaches the host object this event was built from.
    pub fn with_native(mut self, native: NativeHandle) -> Self {
        self.native = Some(native);
        self
    }

    /// The attached host object, if it is a `T`.
    pub fn native<T: Any>(&self) -> Option<&T> {
        self.native
            .as_deref()
            .and_then(|native| native.downcast_ref::<T>())
    }

    pub fn key(&self) -> Key {
        self.key
    }

    /// Full Quartz flag word.
    pub fn flags(&self) -> u64 {
        self.flags
    }

    pub fn is_key_down(&self) -> bool {
        self.key_down
    }

    pub fn kind(&self) -> EventKind {
        if self.key_down {
            EventKind::KeyDown
        } else {
            EventKind::KeyUp
        }
    }

    pub fn modifiers(&self) -> ModifierSet {
        ModifierSet::from_event_flags(self.flags)
    }
}

impl PartialEq for LowLevelEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.flags == other.flags && self.key_down == other.key_down
    }
}

impl Eq for LowLevelEvent {}

impl fmt::Debug for LowLevelEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LowLevelEvent")
            .field("key", &self.key)
            .field("flags", &format_args!("0x{:08X}", self.flags))
            .field("key_down", &self.key_down)
            .field("native", &self.native.is_some())
            .finish()
    }
}

/// Application-level event derived from a [`LowLevelEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighLevelEvent {
    source: Arc<LowLevelEvent>,
    modifier_flags: u64,
}

impl HighLevelEvent {
    pub fn from_low_level(source: Arc<LowLevelEvent>) -> Self {
        let modifier_flags = source.flags() & event_flags::DEVICE_INDEPENDENT_MASK;
        Self {
            source,
            modifier_flags,
        }
    }

    /// The low-level event this was derived from.
    pub fn low_level(&self) -> Arc<LowLevelEvent> {
        Arc::clone(&self.source)
    }

    pub fn key(&self) -> Key {
        self.source.key()
    }

    pub fn kind(&self) -> EventKind {
        self.source.kind()
    }

    /// Device-independent modifier flags.
    pub fn modifier_flags(&self) -> u64 {
        self.modifier_flags
    }

    pub fn modifiers(&self) -> ModifierSet {
        ModifierSet::from_event_flags(self.modifier_flags)
    }
}

/// Which native encoding a [`KeyEvent`] currently caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingState {
    Storage,
    LowLevel,
    HighLevel,
}

#[derive(Clone)]
enum Encoding {
    Storage,
    LowLevel(Arc<LowLevelEvent>),
    HighLevel(Arc<HighLevelEvent>),
}

/// A keyboard event with lazily built, cached native encodings.
pub struct KeyEvent {
    key: Key,
    modifiers: ModifierSet,
    kind: EventKind,
    encoding: Mutex<Encoding>,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: ModifierSet, kind: EventKind) -> Self {
        Self {
            key,
            modifiers,
            kind,
            encoding: Mutex::new(Encoding::Storage),
        }
    }

    /// Wraps an existing low-level event; the cache starts populated.
    pub fn from_low_level(event: LowLevelEvent) -> Self {
        Self {
            key: event.key(),
            modifiers: event.modifiers(),
            kind: event.kind(),
            encoding: Mutex::new(Encoding::LowLevel(Arc::new(event))),
        }
    }

    /// Wraps an existing high-level event; the cache starts populated.
    pub fn from_high_level(event: HighLevelEvent) -> Self {
        let source = event.low_level();
        Self {
            key: source.key(),
            modifiers: source.modifiers(),
            kind: source.kind(),
            encoding: Mutex::new(Encoding::HighLevel(Arc::new(event))),
        }
    }

    pub fn key(&self) -> Key {
        self.key
    }

    pub fn modifiers(&self) -> ModifierSet {
        self.modifiers
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// A fresh event for the same key and modifiers with another kind.
    pub fn with_kind(&self, kind: EventKind) -> KeyEvent {
        KeyEvent::new(self.key, self.modifiers, kind)
    }

    /// Natively encodable events equivalent to this one.
    ///
    /// A `keyPress` becomes a `keyDown`, `keyUp` pair; other kinds return a
    /// clone that shares the cached encodings.
    pub fn expand(&self) -> Vec<KeyEvent> {
        match self.kind {
            EventKind::KeyPress => EventKind::KeyPress
                .expand()
                .iter()
                .map(|kind| self.with_kind(*kind))
                .collect(),
            _ => vec![self.clone()],
        }
    }

    pub fn encoding_state(&self) -> EncodingState {
        match &*self.encoding() {
            Encoding::Storage => EncodingState::Storage,
            Encoding::LowLevel(_) => EncodingState::LowLevel,
            Encoding::HighLevel(_) => EncodingState::HighLevel,
        }
    }

    /// Returns the low-level encoding, building and caching it on first use.
    ///
    /// Fails for `keyPress` and when the backend refuses the event; in both
    /// cases nothing is cached and the call can be retried.
    pub fn low_level(&self, backend: &dyn EventBackend) -> Result<Arc<LowLevelEvent>> {
        let mut encoding = self.encoding();
        match &*encoding {
            Encoding::LowLevel(low) => return Ok(Arc::clone(low)),
            Encoding::HighLevel(high) => return Ok(high.low_level()),
            Encoding::Storage => {}
        }
        let low = self.build_low_level(backend)?;
        *encoding = Encoding::LowLevel(Arc::clone(&low));
        Ok(low)
    }

    /// Returns the high-level encoding, upgrading the cache as needed.
    pub fn high_level(&self, backend: &dyn EventBackend) -> Result<Arc<HighLevelEvent>> {
        let mut encoding = self.encoding();
        for _ in 0..2 {
            match &*encoding {
                Encoding::HighLevel(high) => return Ok(Arc::clone(high)),
                Encoding::LowLevel(low) => {
                    let high = Arc::new(HighLevelEvent::from_low_level(Arc::clone(low)));
                    *encoding = Encoding::HighLevel(Arc::clone(&high));
                    return Ok(high);
                }
                Encoding::Storage => {
                    let low = self.build_low_level(backend)?;
                    *encoding = Encoding::LowLevel(low);
                }
            }
        }
        Err(self.construction_failed())
    }

    fn build_low_level(&self, backend: &dyn EventBackend) -> Result<Arc<LowLevelEvent>> {
        let key_down = match self.kind {
            EventKind::KeyDown => true,
            EventKind::KeyUp => false,
            EventKind::KeyPress => return Err(self.construction_failed()),
        };
        backend
            .create_event(self.key, self.modifiers.to_event_flags(), key_down)
            .map(Arc::new)
            .ok_or_else(|| self.construction_failed())
    }

    pub(crate) fn construction_failed(&self) -> DispatchError {
        DispatchError::construction_failed(self.key, self.modifiers, self.kind)
    }

    fn encoding(&self) -> MutexGuard<'_, Encoding> {
        self.encoding.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Clone for KeyEvent {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            modifiers: self.modifiers,
            kind: self.kind,
            encoding: Mutex::new(self.encoding().clone()),
        }
    }
}

impl PartialEq for KeyEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.modifiers == other.modifiers && self.kind == other.kind
    }
}

impl Eq for KeyEvent {}

impl Hash for KeyEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
        self.modifiers.hash(state);
        self.kind.hash(state);
    }
}

impl fmt::Debug for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyEvent")
            .field("key", &self.key)
            .field("modifiers", &self.modifiers)
            .field("kind", &self.kind)
            .field("encoding", &self.encoding_state())
            .finish()
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{} {}", self.kind, self.key)
        } else {
            write!(f, "{} {}+{}", self.kind, self.modifiers, self.key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordedNative, RecordingBackend};
    use std::collections::hash_map::DefaultHasher;
    use std::thread;

    fn hash_of(event: &KeyEvent) -> u64 {
        let mut hasher = DefaultHasher::new();
        event.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_equality_ignores_cache() {
        let backend = RecordingBackend::new();
        let cached = KeyEvent::new(Key::A, ModifierSet::SHIFT, EventKind::KeyDown);
        let bare = KeyEvent::new(Key::A, ModifierSet::SHIFT, EventKind::KeyDown);
        cached.high_level(&backend).unwrap();

        assert_eq!(cached.encoding_state(), EncodingState::HighLevel);
        assert_eq!(bare.encoding_state(), EncodingState::Storage);
        assert_eq!(cached, bare);
        assert_eq!(hash_of(&cached), hash_of(&bare));
        assert_ne!(cached, bare.with_kind(EventKind::KeyUp));
    }

    #[test]
    fn test_high_level_is_cached() {
        let backend = RecordingBackend::new();
        let event = KeyEvent::new(Key::RETURN, ModifierSet::COMMAND, EventKind::KeyDown);
        let first = event.high_level(&backend).unwrap();
        let second = event.high_level(&backend).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.created_count(), 1);
    }

    #[test]
    fn test_low_level_survives_upgrade() {
        let backend = RecordingBackend::new();
        let event = KeyEvent::new(Key::B, ModifierSet::empty(), EventKind::KeyUp);
        let low = event.low_level(&backend).unwrap();
        assert_eq!(event.encoding_state(), EncodingState::LowLevel);

        let high = event.high_level(&backend).unwrap();
        assert!(Arc::ptr_eq(&low, &high.low_level()));
        assert!(Arc::ptr_eq(&low, &event.low_level(&backend).unwrap()));
        assert_eq!(backend.created_count(), 1);
    }

    #[test]
    fn test_high_level_flags() {
        let backend = RecordingBackend::new();
        let modifiers = ModifierSet::OPTION | ModifierSet::CONTROL;
        let event = KeyEvent::new(Key::C, modifiers, EventKind::KeyDown);
        let high = event.high_level(&backend).unwrap();
        assert_eq!(high.key(), Key::C);
        assert_eq!(high.kind(), EventKind::KeyDown);
        assert_eq!(high.modifiers(), modifiers);
        assert_eq!(high.modifier_flags(), modifiers.to_event_flags());
    }

    #[test]
    fn test_key_press_has_no_native_encoding() {
        let backend = RecordingBackend::new();
        let event = KeyEvent::new(Key::A, ModifierSet::empty(), EventKind::KeyPress);
        let err = event.low_level(&backend).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::EventConstructionFailed {
                kind: EventKind::KeyPress,
                ..
            }
        ));
        assert!(event.high_level(&backend).is_err());
        assert_eq!(event.encoding_state(), EncodingState::Storage);
    }

    #[test]
    fn test_construction_failure_is_retryable() {
        let backend = RecordingBackend::new();
        backend.set_refuse_all(true);
        let event = KeyEvent::new(Key::D, ModifierSet::empty(), EventKind::KeyDown);
        assert!(event.high_level(&backend).is_err());
        assert_eq!(event.encoding_state(), EncodingState::Storage);

        backend.set_refuse_all(false);
        assert!(event.high_level(&backend).is_ok());
        assert_eq!(event.encoding_state(), EncodingState::HighLevel);
    }

    #[test]
    fn test_expand_key_press() {
        let event = KeyEvent::new(Key::Q, ModifierSet::SHIFT, EventKind::KeyPress);
        let expanded = event.expand();
        assert_eq!(expanded.len(), 2);
        assert_eq!(expanded[0], event.with_kind(EventKind::KeyDown));
        assert_eq!(expanded[1], event.with_kind(EventKind::KeyUp));

        let down = event.with_kind(EventKind::KeyDown);
        assert_eq!(down.expand(), vec![down.clone()]);
    }

    #[test]
    fn test_from_native_events() {
        let low = LowLevelEvent::new(Key::Z, ModifierSet::COMMAND.to_event_flags(), true);
        let event = KeyEvent::from_low_level(low.clone());
        assert_eq!(event.encoding_state(), EncodingState::LowLevel);
        assert_eq!(
            event,
            KeyEvent::new(Key::Z, ModifierSet::COMMAND, EventKind::KeyDown)
        );

        let high = HighLevelEvent::from_low_level(Arc::new(low));
        let event = KeyEvent::from_high_level(high);
        assert_eq!(event.encoding_state(), EncodingState::HighLevel);
        let backend = RecordingBackend::new();
        assert_eq!(event.low_level(&backend).unwrap().key(), Key::Z);
        assert_eq!(backend.created_count(), 0);
    }

    #[test]
    fn test_event_kind_parsing() {
        assert_eq!("down".parse::<EventKind>().unwrap(), EventKind::KeyDown);
        assert_eq!("keyUp".parse::<EventKind>().unwrap(), EventKind::KeyUp);
        assert_eq!("Press".parse::<EventKind>().unwrap(), EventKind::KeyPress);
        assert!("hold".parse::<EventKind>().is_err());
    }

    #[test]
    fn test_display() {
        let event = KeyEvent::new(Key::S, ModifierSet::COMMAND, EventKind::KeyPress);
        assert_eq!(event.to_string(), "keyPress cmd+s");
    }

    #[test]
    fn test_concurrent_upgrade_builds_once() {
        let backend = RecordingBackend::new();
        let event = KeyEvent::new(Key::K, ModifierSet::COMMAND, EventKind::KeyDown);

        let encodings: Vec<Arc<HighLevelEvent>> = thread::scope(|scope| {
            let workers: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| event.high_level(&backend).unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });

        assert_eq!(backend.created_count(), 1);
        assert_eq!(event.encoding_state(), EncodingState::HighLevel);
        let first = &encodings[0];
        assert!(encodings.iter().all(|high| Arc::ptr_eq(high, first)));
        assert!(Arc::ptr_eq(
            &first.low_level(),
            &event.low_level(&backend).unwrap()
        ));
    }

    #[test]
    fn test_native_handle_survives_caching() {
        let backend = RecordingBackend::new();
        let event = KeyEvent::new(Key::L, ModifierSet::empty(), EventKind::KeyUp);
        let low = event.low_level(&backend).unwrap();
        let serial = low.native::<RecordedNative>().unwrap().serial;
        assert_eq!(
            event.high_level(&backend).unwrap().low_level().native::<RecordedNative>(),
            Some(&RecordedNative { serial })
        );
        assert!(low.native::<String>().is_none());

        let bare = LowLevelEvent::new(Key::L, 0, false);
        assert!(bare.native::<RecordedNative>().is_none());
        assert_eq!(bare, *low);
    }
}
