//! Shortcut-registration encoding.
//!
//! Global shortcut registration only understands Shift, Control, Option,
//! Command and Caps Lock. Converting a chord to a [`HotKey`] drops the
//! function, numeric-pad and help modifiers, just as the Carbon mask does.

use global_hotkey::hotkey::{Code, HotKey, Modifiers};

use crate::error::{DispatchError, Result};
use crate::key_code::Key;
use crate::modifiers::{parse_chord, ModifierSet};

const MODIFIER_MAP: [(ModifierSet, Modifiers); 5] = [
    (ModifierSet::SHIFT, Modifiers::SHIFT),
    (ModifierSet::CONTROL, Modifiers::CONTROL),
    (ModifierSet::OPTION, Modifiers::ALT),
    (ModifierSet::COMMAND, Modifiers::SUPER),
    (ModifierSet::CAPS_LOCK, Modifiers::CAPS_LOCK),
];

/// Reduced modifier encoding for shortcut registration.
pub fn to_hotkey_modifiers(modifiers: ModifierSet) -> Modifiers {
    MODIFIER_MAP
        .iter()
        .filter(|(set, _)| modifiers.contains(*set))
        .fold(Modifiers::empty(), |mods, (_, bit)| mods | *bit)
}

pub fn from_hotkey_modifiers(modifiers: Modifiers) -> ModifierSet {
    MODIFIER_MAP
        .iter()
        .filter(|(_, bit)| modifiers.contains(*bit))
        .fold(ModifierSet::empty(), |set, (modifier, _)| set | *modifier)
}

/// Encodes a chord as a registrable hotkey.
pub fn to_hotkey(key: Key, modifiers: ModifierSet) -> Result<HotKey> {
    let code = key_to_code(key)
        .ok_or_else(|| DispatchError::invalid_key(key.to_string(), "not usable in a shortcut"))?;
    Ok(HotKey::new(Some(to_hotkey_modifiers(modifiers)), code))
}

/// Decodes a hotkey back into a chord.
pub fn from_hotkey(hotkey: &HotKey) -> Option<(Key, ModifierSet)> {
    let key = CODE_TABLE
        .iter()
        .find(|(_, code)| *code == hotkey.key)
        .map(|(key, _)| *key)?;
    Some((key, from_hotkey_modifiers(hotkey.mods)))
}

/// Parses a chord such as `ctrl+alt+r` straight into a hotkey.
pub fn parse_hotkey(chord: &str) -> Result<HotKey> {
    let (key, modifiers) = parse_chord(chord)?;
    to_hotkey(key, modifiers)
}

fn key_to_code(key: Key) -> Option<Code> {
    CODE_TABLE
        .iter()
        .find(|(candidate, _)| *candidate == key)
        .map(|(_, code)| *code)
}

static CODE_TABLE: &[(Key, Code)] = &[
    // Letters
    (Key::A, Code::KeyA),
    (Key::B, Code::KeyB),
    (Key::C, Code::KeyC),
    (Key::D, Code::KeyD),
    (Key::E, Code::KeyE),
    (Key::F, Code::KeyF),
    (Key::G, Code::KeyG),
    (Key::H, Code::KeyH),
    (Key::I, Code::KeyI),
    (Key::J, Code::KeyJ),
    (Key::K, Code::KeyK),
    (Key::L, Code::KeyL),
    (Key::M, Code::KeyM),
    (Key::N, Code::KeyN),
    (Key::O, Code::KeyO),
    (Key::P, Code::KeyP),
    (Key::Q, Code::KeyQ),
    (Key::R, Code::KeyR),
    (Key::S, Code::KeyS),
    (Key::T, Code::KeyT),
    (Key::U, Code::KeyU),
    (Key::V, Code::KeyV),
    (Key::W, Code::KeyW),
    (Key::X, Code::KeyX),
    (Key::Y, Code::KeyY),
    (Key::Z, Code::KeyZ),
    // Numbers
    (Key::DIGIT_0, Code::Digit0),
    (Key::DIGIT_1, Code::Digit1),
    (Key::DIGIT_2, Code::Digit2),
    (Key::DIGIT_3, Code::Digit3),
    (Key::DIGIT_4, Code::Digit4),
    (Key::DIGIT_5, Code::Digit5),
    (Key::DIGIT_6, Code::Digit6),
    (Key::DIGIT_7, Code::Digit7),
    (Key::DIGIT_8, Code::Digit8),
    (Key::DIGIT_9, Code::Digit9),
    // Punctuation
    (Key::GRAVE, Code::Backquote),
    (Key::MINUS, Code::Minus),
    (Key::EQUAL, Code::Equal),
    (Key::LEFT_BRACKET, Code::BracketLeft),
    (Key::RIGHT_BRACKET, Code::BracketRight),
    (Key::BACKSLASH, Code::Backslash),
    (Key::SEMICOLON, Code::Semicolon),
    (Key::QUOTE, Code::Quote),
    (Key::COMMA, Code::Comma),
    (Key::PERIOD, Code::Period),
    (Key::SLASH, Code::Slash),
    // Function keys
    (Key::F1, Code::F1),
    (Key::F2, Code::F2),
    (Key::F3, Code::F3),
    (Key::F4, Code::F4),
    (Key::F5, Code::F5),
    (Key::F6, Code::F6),
    (Key::F7, Code::F7),
    (Key::F8, Code::F8),
    (Key::F9, Code::F9),
    (Key::F10, Code::F10),
    (Key::F11, Code::F11),
    (Key::F12, Code::F12),
    // Special keys
    (Key::SPACE, Code::Space),
    (Key::RETURN, Code::Enter),
    (Key::TAB, Code::Tab),
    (Key::ESCAPE, Code::Escape),
    (Key::DELETE, Code::Backspace),
    (Key::FORWARD_DELETE, Code::Delete),
    (Key::HOME, Code::Home),
    (Key::END, Code::End),
    (Key::PAGE_UP, Code::PageUp),
    (Key::PAGE_DOWN, Code::PageDown),
    // Arrow keys
    (Key::UP_ARROW, Code::ArrowUp),
    (Key::DOWN_ARROW, Code::ArrowDown),
    (Key::LEFT_ARROW, Code::ArrowLeft),
    (Key::RIGHT_ARROW, Code::ArrowRight),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_hotkey() {
        let hotkey = to_hotkey(Key::R, ModifierSet::CONTROL | ModifierSet::OPTION).unwrap();
        assert_eq!(
            hotkey,
            HotKey::new(Some(Modifiers::CONTROL | Modifiers::ALT), Code::KeyR)
        );
        assert_eq!(hotkey, parse_hotkey("ctrl+alt+r").unwrap());
    }

    #[test]
    fn test_unsupported_modifiers_dropped() {
        let modifiers = ModifierSet::COMMAND | ModifierSet::FUNCTION | ModifierSet::NUMERIC_PAD;
        assert_eq!(to_hotkey_modifiers(modifiers), Modifiers::SUPER);

        let hotkey = to_hotkey(Key::F5, modifiers).unwrap();
        assert_eq!(from_hotkey(&hotkey), Some((Key::F5, ModifierSet::COMMAND)));
    }

    #[test]
    fn test_keys_without_code_rejected() {
        assert!(to_hotkey(Key::KEYPAD_CLEAR, ModifierSet::empty()).is_err());
        assert!(parse_hotkey("cmd+nosuchkey").is_err());
    }
}
