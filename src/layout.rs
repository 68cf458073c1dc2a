//! Keyboard layout lookup.
//!
//! The resolver asks a [`LayoutLookup`] which key, if any, types a character
//! under a given modifier combination. [`UsLayout`] covers the US keyboard
//! on macOS: the bare, Shift, Option and Shift+Option planes.

use crate::key_code::Key;
use crate::modifiers::ModifierSet;

/// Queries the active keyboard layout. Implementations must be side-effect free.
pub trait LayoutLookup {
    fn resolve(&self, character: char, modifiers: ModifierSet) -> Option<Key>;
}

impl<L: LayoutLookup + ?Sized> LayoutLookup for &L {
    fn resolve(&self, character: char, modifiers: ModifierSet) -> Option<Key> {
        (**self).resolve(character, modifiers)
    }
}

impl<L: LayoutLookup + ?Sized> LayoutLookup for Box<L> {
    fn resolve(&self, character: char, modifiers: ModifierSet) -> Option<Key> {
        (**self).resolve(character, modifiers)
    }
}

/// US keyboard layout.
#[derive(Debug, Clone, Copy, Default)]
pub struct UsLayout;

impl UsLayout {
    pub fn new() -> Self {
        Self
    }

    fn plane(modifiers: ModifierSet) -> Option<&'static [(char, Key)]> {
        let plane: &'static [(char, Key)] = if modifiers.is_empty() {
            BARE_PLANE
        } else if modifiers == ModifierSet::SHIFT {
            SHIFT_PLANE
        } else if modifiers == ModifierSet::OPTION {
            OPTION_PLANE
        } else if modifiers == ModifierSet::SHIFT | ModifierSet::OPTION {
            SHIFT_OPTION_PLANE
        } else {
            return None;
        };
        Some(plane)
    }
}

impl LayoutLookup for UsLayout {
    fn resolve(&self, character: char, modifiers: ModifierSet) -> Option<Key> {
        Self::plane(modifiers)?
            .iter()
            .find(|(c, _)| *c == character)
            .map(|(_, key)| *key)
    }
}

static BARE_PLANE: &[(char, Key)] = &[
    ('a', Key::A),
    ('b', Key::B),
    ('c', Key::C),
    ('d', Key::D),
    ('e', Key::E),
    ('f', Key::F),
    ('g', Key::G),
    ('h', Key::H),
    ('i', Key::I),
    ('j', Key::J),
    ('k', Key::K),
    ('l', Key::L),
    ('m', Key::M),
    ('n', Key::N),
    ('o', Key::O),
    ('p', Key::P),
    ('q', Key::Q),
    ('r', Key::R),
    ('s', Key::S),
    ('t', Key::T),
    ('u', Key::U),
    ('v', Key::V),
    ('w', Key::W),
    ('x', Key::X),
    ('y', Key::Y),
    ('z', Key::Z),
    ('0', Key::DIGIT_0),
    ('1', Key::DIGIT_1),
    ('2', Key::DIGIT_2),
    ('3', Key::DIGIT_3),
    ('4', Key::DIGIT_4),
    ('5', Key::DIGIT_5),
    ('6', Key::DIGIT_6),
    ('7', Key::DIGIT_7),
    ('8', Key::DIGIT_8),
    ('9', Key::DIGIT_9),
    ('`', Key::GRAVE),
    ('-', Key::MINUS),
    ('=', Key::EQUAL),
    ('[', Key::LEFT_BRACKET),
    (']', Key::RIGHT_BRACKET),
    ('\\', Key::BACKSLASH),
    (';', Key::SEMICOLON),
    ('\'', Key::QUOTE),
    (',', Key::COMMA),
    ('.', Key::PERIOD),
    ('/', Key::SLASH),
    (' ', Key::SPACE),
    ('\t', Key::TAB),
    ('\n', Key::RETURN),
    ('\r', Key::RETURN),
];

static SHIFT_PLANE: &[(char, Key)] = &[
    ('A', Key::A),
    ('B', Key::B),
    ('C', Key::C),
    ('D', Key::D),
    ('E', Key::E),
    ('F', Key::F),
    ('G', Key::G),
    ('H', Key::H),
    ('I', Key::I),
    ('J', Key::J),
    ('K', Key::K),
    ('L', Key::L),
    ('M', Key::M),
    ('N', Key::N),
    ('O', Key::O),
    ('P', Key::P),
    ('Q', Key::Q),
    ('R', Key::R),
    ('S', Key::S),
    ('T', Key::T),
    ('U', Key::U),
    ('V', Key::V),
    ('W', Key::W),
    ('X', Key::X),
    ('Y', Key::Y),
    ('Z', Key::Z),
    (')', Key::DIGIT_0),
    ('!', Key::DIGIT_1),
    ('@', Key::DIGIT_2),
    ('#', Key::DIGIT_3),
    ('$', Key::DIGIT_4),
    ('%', Key::DIGIT_5),
    ('^', Key::DIGIT_6),
    ('&', Key::DIGIT_7),
    ('*', Key::DIGIT_8),
    ('(', Key::DIGIT_9),
    ('~', Key::GRAVE),
    ('_', Key::MINUS),
    ('+', Key::EQUAL),
    ('{', Key::LEFT_BRACKET),
    ('}', Key::RIGHT_BRACKET),
    ('|', Key::BACKSLASH),
    (':', Key::SEMICOLON),
    ('"', Key::QUOTE),
    ('<', Key::COMMA),
    ('>', Key::PERIOD),
    ('?', Key::SLASH),
];

static OPTION_PLANE: &[(char, Key)] = &[
    ('å', Key::A),
    ('∫', Key::B),
    ('ç', Key::C),
    ('∂', Key::D),
    ('ƒ', Key::F),
    ('©', Key::G),
    ('˙', Key::H),
    ('∆', Key::J),
    ('˚', Key::K),
    ('¬', Key::L),
    ('µ', Key::M),
    ('ø', Key::O),
    ('π', Key::P),
    ('œ', Key::Q),
    ('®', Key::R),
    ('ß', Key::S),
    ('†', Key::T),
    ('√', Key::V),
    ('∑', Key::W),
    ('≈', Key::X),
    ('¥', Key::Y),
    ('Ω', Key::Z),
    ('º', Key::DIGIT_0),
    ('¡', Key::DIGIT_1),
    ('™', Key::DIGIT_2),
    ('£', Key::DIGIT_3),
    ('¢', Key::DIGIT_4),
    ('∞', Key::DIGIT_5),
    ('§', Key::DIGIT_6),
    ('¶', Key::DIGIT_7),
    ('•', Key::DIGIT_8),
    ('ª', Key::DIGIT_9),
    ('–', Key::MINUS),
    ('≠', Key::EQUAL),
    ('“', Key::LEFT_BRACKET),
    ('‘', Key::RIGHT_BRACKET),
    ('«', Key::BACKSLASH),
    ('…', Key::SEMICOLON),
    ('æ', Key::QUOTE),
    ('≤', Key::COMMA),
    ('≥', Key::PERIOD),
    ('÷', Key::SLASH),
];

static SHIFT_OPTION_PLANE: &[(char, Key)] = &[
    ('Å', Key::A),
    ('ı', Key::B),
    ('Ç', Key::C),
    ('Î', Key::D),
    ('Ï', Key::F),
    ('˝', Key::G),
    ('Ó', Key::H),
    ('Ô', Key::J),
    ('Ò', Key::L),
    ('Â', Key::M),
    ('Ø', Key::O),
    ('∏', Key::P),
    ('Œ', Key::Q),
    ('‰', Key::R),
    ('Í', Key::S),
    ('ˇ', Key::T),
    ('◊', Key::V),
    ('„', Key::W),
    ('˛', Key::X),
    ('Á', Key::Y),
    ('¸', Key::Z),
    ('—', Key::MINUS),
    ('±', Key::EQUAL),
    ('”', Key::LEFT_BRACKET),
    ('’', Key::RIGHT_BRACKET),
    ('»', Key::BACKSLASH),
    ('Ú', Key::SEMICOLON),
    ('Æ', Key::QUOTE),
    ('¯', Key::COMMA),
    ('˘', Key::PERIOD),
    ('¿', Key::SLASH),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_planes() {
        let layout = UsLayout::new();
        assert_eq!(layout.resolve('a', ModifierSet::empty()), Some(Key::A));
        assert_eq!(layout.resolve('A', ModifierSet::SHIFT), Some(Key::A));
        assert_eq!(layout.resolve('å', ModifierSet::OPTION), Some(Key::A));
        assert_eq!(
            layout.resolve('Å', ModifierSet::SHIFT | ModifierSet::OPTION),
            Some(Key::A)
        );
        assert_eq!(layout.resolve('\n', ModifierSet::empty()), Some(Key::RETURN));
    }

    #[test]
    fn test_no_match() {
        let layout = UsLayout::new();
        assert_eq!(layout.resolve('A', ModifierSet::empty()), None);
        assert_eq!(layout.resolve('a', ModifierSet::COMMAND), None);
        assert_eq!(layout.resolve('€', ModifierSet::OPTION), None);
    }

    #[test]
    fn test_planes_have_unique_characters() {
        for plane in [BARE_PLANE, SHIFT_PLANE, OPTION_PLANE, SHIFT_OPTION_PLANE] {
            for (i, (c, _)) in plane.iter().enumerate() {
                assert!(
                    plane[i + 1..].iter().all(|(other, _)| other != c),
                    "duplicate character {c:?}"
                );
            }
        }
    }
}
