//! Character to key-combination resolution.
//!
//! A character is resolved by trying a fixed, ordered list of modifier
//! combinations against the layout and taking the first match. Case is never
//! inspected directly: an uppercase letter resolves through the Shift plane
//! because the layout says so.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DispatchError, Result};
use crate::event::{EventKind, KeyEvent};
use crate::key_code::Key;
use crate::layout::LayoutLookup;
use crate::modifiers::ModifierSet;

/// Modifier combinations tried for every character, in order.
pub const SEARCH_ORDER: [ModifierSet; 4] = [
    ModifierSet::empty(),
    ModifierSet::SHIFT,
    ModifierSet::OPTION,
    ModifierSet::SHIFT.union(ModifierSet::OPTION),
];

/// How a resolved character is emitted when expanding text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextStyle {
    /// One `keyPress` event per character.
    #[default]
    Press,
    /// An explicit `keyDown`, `keyUp` pair per character.
    DownUp,
}

impl TextStyle {
    /// Number of events one resolved character contributes.
    pub fn events_per_char(self) -> usize {
        match self {
            TextStyle::Press => 1,
            TextStyle::DownUp => 2,
        }
    }
}

/// Resolves characters to keys using a layout lookup.
#[derive(Debug, Clone, Default)]
pub struct CharacterResolver<L> {
    layout: L,
}

impl<L: LayoutLookup> CharacterResolver<L> {
    pub fn new(layout: L) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }

    /// Finds the first combination in search order that types `character`.
    pub fn resolve_char(&self, character: char) -> Result<(Key, ModifierSet)> {
        SEARCH_ORDER
            .iter()
            .find_map(|modifiers| {
                self.layout
                    .resolve(character, *modifiers)
                    .map(|key| (key, *modifiers))
            })
            .ok_or_else(|| DispatchError::unresolvable(character))
    }

    /// Expands `text` into key events in character order.
    ///
    /// Characters no combination can type are dropped with a warning; compare the
    /// result length against `TextStyle::events_per_char` to detect this.
    pub fn resolve_str(&self, text: &str, style: TextStyle) -> Vec<KeyEvent> {
        let mut events = Vec::with_capacity(text.len() * style.events_per_char());
        for character in text.chars() {
            let (key, modifiers) = match self.resolve_char(character) {
                Ok(resolved) => resolved,
                Err(_) => {
                    warn!(?character, "skipping character with no key combination");
                    continue;
                }
            };
            match style {
                TextStyle::Press => {
                    events.push(KeyEvent::new(key, modifiers, EventKind::KeyPress));
                }
                TextStyle::DownUp => {
                    events.push(KeyEvent::new(key, modifiers, EventKind::KeyDown));
                    events.push(KeyEvent::new(key, modifiers, EventKind::KeyUp));
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::UsLayout;
    use std::cell::RefCell;

    /// Records each lookup so the order can be checked.
    struct LookupLog {
        hits: Vec<(char, ModifierSet, Key)>,
        lookups: RefCell<Vec<ModifierSet>>,
    }

    impl LayoutLookup for LookupLog {
        fn resolve(&self, character: char, modifiers: ModifierSet) -> Option<Key> {
            self.lookups.borrow_mut().push(modifiers);
            self.hits
                .iter()
                .find(|(c, m, _)| *c == character && *m == modifiers)
                .map(|(_, _, key)| *key)
        }
    }

    #[test]
    fn test_uppercase_uses_shift() {
        let resolver = CharacterResolver::new(UsLayout::new());
        assert_eq!(
            resolver.resolve_char('H').unwrap(),
            (Key::H, ModifierSet::SHIFT)
        );
        assert_eq!(
            resolver.resolve_char('h').unwrap(),
            (Key::H, ModifierSet::empty())
        );
    }

    #[test]
    fn test_option_planes() {
        let resolver = CharacterResolver::new(UsLayout::new());
        assert_eq!(
            resolver.resolve_char('ß').unwrap(),
            (Key::S, ModifierSet::OPTION)
        );
        assert_eq!(
            resolver.resolve_char('Å').unwrap(),
            (Key::A, ModifierSet::SHIFT | ModifierSet::OPTION)
        );
    }

    #[test]
    fn test_first_match_wins() {
        let layout = LookupLog {
            hits: vec![
                ('x', ModifierSet::OPTION, Key::X),
                ('x', ModifierSet::SHIFT, Key::Z),
            ],
            lookups: RefCell::new(Vec::new()),
        };
        let resolver = CharacterResolver::new(&layout);
        assert_eq!(
            resolver.resolve_char('x').unwrap(),
            (Key::Z, ModifierSet::SHIFT)
        );
        assert_eq!(
            *layout.lookups.borrow(),
            vec![ModifierSet::empty(), ModifierSet::SHIFT]
        );
    }

    #[test]
    fn test_unresolvable_char_is_error() {
        let resolver = CharacterResolver::new(UsLayout::new());
        let err = resolver.resolve_char('😀').unwrap_err();
        assert!(matches!(
            err,
            DispatchError::CharacterUnresolvable { character: '😀' }
        ));
    }

    #[test]
    fn test_resolve_str_preserves_order() {
        let resolver = CharacterResolver::new(UsLayout::new());
        let events = resolver.resolve_str("Hi", TextStyle::Press);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].key(), Key::H);
        assert_eq!(events[0].modifiers(), ModifierSet::SHIFT);
        assert_eq!(events[1].key(), Key::I);
        assert_eq!(events[1].modifiers(), ModifierSet::empty());
        assert!(events.iter().all(|e| e.kind() == EventKind::KeyPress));
    }

    #[test]
    fn test_resolve_str_drops_unresolvable() {
        let resolver = CharacterResolver::new(UsLayout::new());
        let text = "a😀b";
        let events = resolver.resolve_str(text, TextStyle::DownUp);
        assert_eq!(events.len(), 2 * TextStyle::DownUp.events_per_char());
        let kinds: Vec<EventKind> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::KeyDown,
                EventKind::KeyUp,
                EventKind::KeyDown,
                EventKind::KeyUp
            ]
        );
        assert_eq!(events[2].key(), Key::B);
    }
}
