//! Ordered key event sequences and the operations that send them.

use tracing::debug;

use crate::dispatcher::{Dispatcher, SendReport};
use crate::error::Result;
use crate::event::{EventKind, KeyEvent};
use crate::key_code::Key;
use crate::layout::LayoutLookup;
use crate::modifiers::{parse_chord, ModifierSet};
use crate::process_finder::ProcessHandle;
use crate::resolver::{CharacterResolver, TextStyle};

/// An ordered list of key events to deliver.
///
/// Insertion order is delivery order and duplicates are kept.
///
/// # Example
///
/// ```no_run
/// use key_dispatch::{CharacterResolver, DispatchConfig, Dispatcher, KeySender, TextStyle, UsLayout};
///
/// let resolver = CharacterResolver::new(UsLayout::new());
/// let sender = KeySender::from_text("Hello", &resolver, TextStyle::Press);
///
/// let mut dispatcher = Dispatcher::native(DispatchConfig::default()).unwrap();
/// sender.send_to_app(&mut dispatcher, "TextEdit").unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySender {
    events: Vec<KeyEvent>,
}

impl KeySender {
    pub fn new(events: Vec<KeyEvent>) -> Self {
        Self { events }
    }

    pub fn from_key(key: Key, modifiers: ModifierSet, kind: EventKind) -> Self {
        Self::new(vec![KeyEvent::new(key, modifiers, kind)])
    }

    /// A single key press from a chord such as `cmd+shift+s`.
    pub fn press_chord(chord: &str) -> Result<Self> {
        let (key, modifiers) = parse_chord(chord)?;
        Ok(Self::from_key(key, modifiers, EventKind::KeyPress))
    }

    /// Types one character. Fails when no modifier combination produces it.
    pub fn from_char<L: LayoutLookup>(
        character: char,
        resolver: &CharacterResolver<L>,
        kind: EventKind,
    ) -> Result<Self> {
        let (key, modifiers) = resolver.resolve_char(character)?;
        Ok(Self::from_key(key, modifiers, kind))
    }

    /// Types a string. Characters the layout cannot produce are dropped.
    pub fn from_text<L: LayoutLookup>(
        text: &str,
        resolver: &CharacterResolver<L>,
        style: TextStyle,
    ) -> Self {
        Self::new(resolver.resolve_str(text, style))
    }

    /// Appends the events for `text` and returns how many were added.
    pub fn extend_with_text<L: LayoutLookup>(
        &mut self,
        text: &str,
        resolver: &CharacterResolver<L>,
        style: TextStyle,
    ) -> usize {
        let added = resolver.resolve_str(text, style);
        let count = added.len();
        self.events.extend(added);
        debug!(count, total = self.events.len(), "appended text events");
        count
    }

    pub fn events(&self) -> &[KeyEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The sequence with every `keyPress` split into its down/up pair.
    pub fn expanded(&self) -> Vec<KeyEvent> {
        self.events.iter().flat_map(KeyEvent::expand).collect()
    }

    pub fn send_to_process(
        &self,
        dispatcher: &Dispatcher,
        process: &ProcessHandle,
    ) -> Result<SendReport> {
        dispatcher.send_to_process(&self.events, process)
    }

    pub fn send_to_app(&self, dispatcher: &mut Dispatcher, name: &str) -> Result<SendReport> {
        dispatcher.send_to_app(&self.events, name)
    }

    pub fn send_to_frontmost(&self, dispatcher: &mut Dispatcher) -> Result<SendReport> {
        dispatcher.send_to_frontmost(&self.events)
    }

    pub fn send_globally(&self, dispatcher: &Dispatcher) -> Result<SendReport> {
        dispatcher.send_globally(&self.events)
    }

    pub fn open_and_send(&self, dispatcher: &mut Dispatcher, name: &str) -> Result<SendReport> {
        dispatcher.open_and_send(&self.events, name)
    }
}

impl From<Vec<KeyEvent>> for KeySender {
    fn from(events: Vec<KeyEvent>) -> Self {
        Self::new(events)
    }
}
