//! Physical key identifiers.
//!
//! A [`Key`] wraps the macOS hardware virtual keycode (the `kVK_*` constants
//! from `HIToolbox/Events.h`). It names a position on the keyboard, not a
//! character: `Key::A` types `a`, `A` or `å` depending on the modifiers held.

use std::fmt;

use crate::error::{DispatchError, Result};

/// Platform virtual keycode.
pub type KeyCode = u16;

/// Opaque identifier for a physical key, backed by its virtual keycode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key(KeyCode);

impl Key {
    pub const A: Key = Key(0x00);
    pub const S: Key = Key(0x01);
    pub const D: Key = Key(0x02);
    pub const F: Key = Key(0x03);
    pub const H: Key = Key(0x04);
    pub const G: Key = Key(0x05);
    pub const Z: Key = Key(0x06);
    pub const X: Key = Key(0x07);
    pub const C: Key = Key(0x08);
    pub const V: Key = Key(0x09);
    pub const ISO_SECTION: Key = Key(0x0A);
    pub const B: Key = Key(0x0B);
    pub const Q: Key = Key(0x0C);
    pub const W: Key = Key(0x0D);
    pub const E: Key = Key(0x0E);
    pub const R: Key = Key(0x0F);
    pub const Y: Key = Key(0x10);
    pub const T: Key = Key(0x11);
    pub const DIGIT_1: Key = Key(0x12);
    pub const DIGIT_2: Key = Key(0x13);
    pub const DIGIT_3: Key = Key(0x14);
    pub const DIGIT_4: Key = Key(0x15);
    pub const DIGIT_6: Key = Key(0x16);
    pub const DIGIT_5: Key = Key(0x17);
    pub const EQUAL: Key = Key(0x18);
    pub const DIGIT_9: Key = Key(0x19);
    pub const DIGIT_7: Key = Key(0x1A);
    pub const MINUS: Key = Key(0x1B);
    pub const DIGIT_8: Key = Key(0x1C);
    pub const DIGIT_0: Key = Key(0x1D);
    pub const RIGHT_BRACKET: Key = Key(0x1E);
    pub const O: Key = Key(0x1F);
    pub const U: Key = Key(0x20);
    pub const LEFT_BRACKET: Key = Key(0x21);
    pub const I: Key = Key(0x22);
    pub const P: Key = Key(0x23);
    pub const RETURN: Key = Key(0x24);
    pub const L: Key = Key(0x25);
    pub const J: Key = Key(0x26);
    pub const QUOTE: Key = Key(0x27);
    pub const K: Key = Key(0x28);
    pub const SEMICOLON: Key = Key(0x29);
    pub const BACKSLASH: Key = Key(0x2A);
    pub const COMMA: Key = Key(0x2B);
    pub const SLASH: Key = Key(0x2C);
    pub const N: Key = Key(0x2D);
    pub const M: Key = Key(0x2E);
    pub const PERIOD: Key = Key(0x2F);
    pub const TAB: Key = Key(0x30);
    pub const SPACE: Key = Key(0x31);
    pub const GRAVE: Key = Key(0x32);
    pub const DELETE: Key = Key(0x33);
    pub const ESCAPE: Key = Key(0x35);
    pub const RIGHT_COMMAND: Key = Key(0x36);
    pub const COMMAND: Key = Key(0x37);
    pub const SHIFT: Key = Key(0x38);
    pub const CAPS_LOCK: Key = Key(0x39);
    pub const OPTION: Key = Key(0x3A);
    pub const CONTROL: Key = Key(0x3B);
    pub const RIGHT_SHIFT: Key = Key(0x3C);
    pub const RIGHT_OPTION: Key = Key(0x3D);
    pub const RIGHT_CONTROL: Key = Key(0x3E);
    pub const FUNCTION: Key = Key(0x3F);
    pub const F17: Key = Key(0x40);
    pub const KEYPAD_DECIMAL: Key = Key(0x41);
    pub const KEYPAD_MULTIPLY: Key = Key(0x43);
    pub const KEYPAD_PLUS: Key = Key(0x45);
    pub const KEYPAD_CLEAR: Key = Key(0x47);
    pub const VOLUME_UP: Key = Key(0x48);
    pub const VOLUME_DOWN: Key = Key(0x49);
    pub const MUTE: Key = Key(0x4A);
    pub const KEYPAD_DIVIDE: Key = Key(0x4B);
    pub const KEYPAD_ENTER: Key = Key(0x4C);
    pub const KEYPAD_MINUS: Key = Key(0x4E);
    pub const F18: Key = Key(0x4F);
    pub const F19: Key = Key(0x50);
    pub const KEYPAD_EQUALS: Key = Key(0x51);
    pub const KEYPAD_0: Key = Key(0x52);
    pub const KEYPAD_1: Key = Key(0x53);
    pub const KEYPAD_2: Key = Key(0x54);
    pub const KEYPAD_3: Key = Key(0x55);
    pub const KEYPAD_4: Key = Key(0x56);
    pub const KEYPAD_5: Key = Key(0x57);
    pub const KEYPAD_6: Key = Key(0x58);
    pub const KEYPAD_7: Key = Key(0x59);
    pub const F20: Key = Key(0x5A);
    pub const KEYPAD_8: Key = Key(0x5B);
    pub const KEYPAD_9: Key = Key(0x5C);
    pub const F5: Key = Key(0x60);
    pub const F6: Key = Key(0x61);
    pub const F7: Key = Key(0x62);
    pub const F3: Key = Key(0x63);
    pub const F8: Key = Key(0x64);
    pub const F9: Key = Key(0x65);
    pub const F11: Key = Key(0x67);
    pub const F13: Key = Key(0x69);
    pub const F16: Key = Key(0x6A);
    pub const F14: Key = Key(0x6B);
    pub const F10: Key = Key(0x6D);
    pub const F12: Key = Key(0x6F);
    pub const F15: Key = Key(0x71);
    pub const HELP: Key = Key(0x72);
    pub const HOME: Key = Key(0x73);
    pub const PAGE_UP: Key = Key(0x74);
    pub const FORWARD_DELETE: Key = Key(0x75);
    pub const F4: Key = Key(0x76);
    pub const END: Key = Key(0x77);
    pub const F2: Key = Key(0x78);
    pub const PAGE_DOWN: Key = Key(0x79);
    pub const F1: Key = Key(0x7A);
    pub const LEFT_ARROW: Key = Key(0x7B);
    pub const RIGHT_ARROW: Key = Key(0x7C);
    pub const DOWN_ARROW: Key = Key(0x7D);
    pub const UP_ARROW: Key = Key(0x7E);

    /// Wraps a raw virtual keycode. The code is not checked against the table.
    pub const fn from_code(code: KeyCode) -> Self {
        Key(code)
    }

    /// Returns the virtual keycode for this key.
    pub const fn code(self) -> KeyCode {
        self.0
    }

    /// True when the keycode appears in the key table.
    pub fn is_known(self) -> bool {
        self.name().is_some()
    }

    /// Canonical lowercase name of the key, if it is in the table.
    pub fn name(self) -> Option<&'static str> {
        KEY_TABLE
            .iter()
            .find(|(key, _)| *key == self)
            .map(|(_, name)| *name)
    }

    /// True for the modifier keys themselves (Shift, Control, ...).
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            Key::COMMAND
                | Key::RIGHT_COMMAND
                | Key::SHIFT
                | Key::RIGHT_SHIFT
                | Key::CAPS_LOCK
                | Key::OPTION
                | Key::RIGHT_OPTION
                | Key::CONTROL
                | Key::RIGHT_CONTROL
                | Key::FUNCTION
        )
    }

    /// Looks up a key by name. Case-insensitive; accepts common aliases.
    pub fn from_name(name: &str) -> Result<Key> {
        let lower = name.trim().to_lowercase();
        if lower.is_empty() {
            return Err(DispatchError::invalid_key(name, "empty key name"));
        }

        let aliased = match lower.as_str() {
            "enter" => "return",
            "esc" => "escape",
            "backspace" => "delete",
            "del" | "forwarddelete" => "forward_delete",
            "cmd" | "meta" | "super" => "command",
            "ctrl" => "control",
            "alt" => "option",
            "fn" => "function",
            "left" | "arrowleft" => "left_arrow",
            "right" | "arrowright" => "right_arrow",
            "up" | "arrowup" => "up_arrow",
            "down" | "arrowdown" => "down_arrow",
            "pageup" => "page_up",
            "pagedown" => "page_down",
            "capslock" => "caps_lock",
            "`" => "grave",
            "-" => "minus",
            "=" => "equal",
            "[" => "left_bracket",
            "]" => "right_bracket",
            "\\" => "backslash",
            ";" => "semicolon",
            "'" => "quote",
            "," => "comma",
            "." => "period",
            "/" => "slash",
            other => other,
        };

        KEY_TABLE
            .iter()
            .find(|(_, candidate)| *candidate == aliased)
            .map(|(key, _)| *key)
            .ok_or_else(|| DispatchError::invalid_key(name, "unknown key name"))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "keycode 0x{:02X}", self.0),
        }
    }
}

impl From<Key> for KeyCode {
    fn from(key: Key) -> Self {
        key.0
    }
}

static KEY_TABLE: &[(Key, &str)] = &[
    // Letters
    (Key::A, "a"),
    (Key::B, "b"),
    (Key::C, "c"),
    (Key::D, "d"),
    (Key::E, "e"),
    (Key::F, "f"),
    (Key::G, "g"),
    (Key::H, "h"),
    (Key::I, "i"),
    (Key::J, "j"),
    (Key::K, "k"),
    (Key::L, "l"),
    (Key::M, "m"),
    (Key::N, "n"),
    (Key::O, "o"),
    (Key::P, "p"),
    (Key::Q, "q"),
    (Key::R, "r"),
    (Key::S, "s"),
    (Key::T, "t"),
    (Key::U, "u"),
    (Key::V, "v"),
    (Key::W, "w"),
    (Key::X, "x"),
    (Key::Y, "y"),
    (Key::Z, "z"),
    // Numbers
    (Key::DIGIT_0, "0"),
    (Key::DIGIT_1, "1"),
    (Key::DIGIT_2, "2"),
    (Key::DIGIT_3, "3"),
    (Key::DIGIT_4, "4"),
    (Key::DIGIT_5, "5"),
    (Key::DIGIT_6, "6"),
    (Key::DIGIT_7, "7"),
    (Key::DIGIT_8, "8"),
    (Key::DIGIT_9, "9"),
    // Punctuation
    (Key::GRAVE, "grave"),
    (Key::MINUS, "minus"),
    (Key::EQUAL, "equal"),
    (Key::LEFT_BRACKET, "left_bracket"),
    (Key::RIGHT_BRACKET, "right_bracket"),
    (Key::BACKSLASH, "backslash"),
    (Key::SEMICOLON, "semicolon"),
    (Key::QUOTE, "quote"),
    (Key::COMMA, "comma"),
    (Key::PERIOD, "period"),
    (Key::SLASH, "slash"),
    (Key::ISO_SECTION, "section"),
    // Special keys
    (Key::RETURN, "return"),
    (Key::TAB, "tab"),
    (Key::SPACE, "space"),
    (Key::DELETE, "delete"),
    (Key::ESCAPE, "escape"),
    (Key::FORWARD_DELETE, "forward_delete"),
    (Key::HELP, "help"),
    (Key::HOME, "home"),
    (Key::END, "end"),
    (Key::PAGE_UP, "page_up"),
    (Key::PAGE_DOWN, "page_down"),
    // Modifiers
    (Key::COMMAND, "command"),
    (Key::RIGHT_COMMAND, "right_command"),
    (Key::SHIFT, "shift"),
    (Key::RIGHT_SHIFT, "right_shift"),
    (Key::CAPS_LOCK, "caps_lock"),
    (Key::OPTION, "option"),
    (Key::RIGHT_OPTION, "right_option"),
    (Key::CONTROL, "control"),
    (Key::RIGHT_CONTROL, "right_control"),
    (Key::FUNCTION, "function"),
    // Arrow keys
    (Key::LEFT_ARROW, "left_arrow"),
    (Key::RIGHT_ARROW, "right_arrow"),
    (Key::DOWN_ARROW, "down_arrow"),
    (Key::UP_ARROW, "up_arrow"),
    // Function keys
    (Key::F1, "f1"),
    (Key::F2, "f2"),
    (Key::F3, "f3"),
    (Key::F4, "f4"),
    (Key::F5, "f5"),
    (Key::F6, "f6"),
    (Key::F7, "f7"),
    (Key::F8, "f8"),
    (Key::F9, "f9"),
    (Key::F10, "f10"),
    (Key::F11, "f11"),
    (Key::F12, "f12"),
    (Key::F13, "f13"),
    (Key::F14, "f14"),
    (Key::F15, "f15"),
    (Key::F16, "f16"),
    (Key::F17, "f17"),
    (Key::F18, "f18"),
    (Key::F19, "f19"),
    (Key::F20, "f20"),
    // Keypad
    (Key::KEYPAD_0, "keypad_0"),
    (Key::KEYPAD_1, "keypad_1"),
    (Key::KEYPAD_2, "keypad_2"),
    (Key::KEYPAD_3, "keypad_3"),
    (Key::KEYPAD_4, "keypad_4"),
    (Key::KEYPAD_5, "keypad_5"),
    (Key::KEYPAD_6, "keypad_6"),
    (Key::KEYPAD_7, "keypad_7"),
    (Key::KEYPAD_8, "keypad_8"),
    (Key::KEYPAD_9, "keypad_9"),
    (Key::KEYPAD_DECIMAL, "keypad_decimal"),
    (Key::KEYPAD_MULTIPLY, "keypad_multiply"),
    (Key::KEYPAD_PLUS, "keypad_plus"),
    (Key::KEYPAD_MINUS, "keypad_minus"),
    (Key::KEYPAD_DIVIDE, "keypad_divide"),
    (Key::KEYPAD_EQUALS, "keypad_equals"),
    (Key::KEYPAD_ENTER, "keypad_enter"),
    (Key::KEYPAD_CLEAR, "keypad_clear"),
    // Media
    (Key::VOLUME_UP, "volume_up"),
    (Key::VOLUME_DOWN, "volume_down"),
    (Key::MUTE, "mute"),
];
