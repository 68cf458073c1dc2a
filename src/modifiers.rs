//! Modifier sets and their platform flag encodings.
//!
//! Two encodings exist on the host. The full one is the Quartz event-flag
//! word carried by low-level events. The reduced one is the Carbon modifier
//! mask understood by the legacy shortcut-registration layer, which has no
//! numeric-pad, help or function bits.

use std::fmt;

use bitflags::bitflags;

use crate::error::{DispatchError, Result};
use crate::key_code::Key;

bitflags! {
    /// Set of held-down modifier keys.
    #[derive(Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ModifierSet: u8 {
        const SHIFT       = 0b0000_0001;
        const CONTROL     = 0b0000_0010;
        const OPTION      = 0b0000_0100;
        const COMMAND     = 0b0000_1000;
        const CAPS_LOCK   = 0b0001_0000;
        const FUNCTION    = 0b0010_0000;
        const NUMERIC_PAD = 0b0100_0000;
        const HELP        = 0b1000_0000;
    }
}

/// Quartz event flags (`CGEventFlags`).
pub mod event_flags {
    pub const ALPHA_SHIFT: u64 = 0x0001_0000;
    pub const SHIFT: u64 = 0x0002_0000;
    pub const CONTROL: u64 = 0x0004_0000;
    pub const ALTERNATE: u64 = 0x0008_0000;
    pub const COMMAND: u64 = 0x0010_0000;
    pub const NUMERIC_PAD: u64 = 0x0020_0000;
    pub const HELP: u64 = 0x0040_0000;
    pub const SECONDARY_FN: u64 = 0x0080_0000;

    /// Bits that survive into device-independent (high-level) flags.
    pub const DEVICE_INDEPENDENT_MASK: u64 = 0xFFFF_0000;
}

/// Carbon modifier mask bits (`cmdKey`, `shiftKey`, ...).
pub mod carbon_flags {
    pub const CMD_KEY: u32 = 1 << 8;
    pub const SHIFT_KEY: u32 = 1 << 9;
    pub const ALPHA_LOCK: u32 = 1 << 10;
    pub const OPTION_KEY: u32 = 1 << 11;
    pub const CONTROL_KEY: u32 = 1 << 12;
}

const EVENT_FLAG_MAP: [(ModifierSet, u64); 8] = [
    (ModifierSet::CAPS_LOCK, event_flags::ALPHA_SHIFT),
    (ModifierSet::SHIFT, event_flags::SHIFT),
    (ModifierSet::CONTROL, event_flags::CONTROL),
    (ModifierSet::OPTION, event_flags::ALTERNATE),
    (ModifierSet::COMMAND, event_flags::COMMAND),
    (ModifierSet::NUMERIC_PAD, event_flags::NUMERIC_PAD),
    (ModifierSet::HELP, event_flags::HELP),
    (ModifierSet::FUNCTION, event_flags::SECONDARY_FN),
];

const CARBON_FLAG_MAP: [(ModifierSet, u32); 5] = [
    (ModifierSet::COMMAND, carbon_flags::CMD_KEY),
    (ModifierSet::SHIFT, carbon_flags::SHIFT_KEY),
    (ModifierSet::CAPS_LOCK, carbon_flags::ALPHA_LOCK),
    (ModifierSet::OPTION, carbon_flags::OPTION_KEY),
    (ModifierSet::CONTROL, carbon_flags::CONTROL_KEY),
];

impl ModifierSet {
    /// Modifiers that the reduced encoding cannot carry.
    pub const UNSUPPORTED_BY_CARBON: ModifierSet = ModifierSet::FUNCTION
        .union(ModifierSet::NUMERIC_PAD)
        .union(ModifierSet::HELP);

    /// Full Quartz encoding.
    pub fn to_event_flags(self) -> u64 {
        EVENT_FLAG_MAP
            .iter()
            .filter(|(modifier, _)| self.contains(*modifier))
            .fold(0, |flags, (_, bit)| flags | bit)
    }

    /// Decodes Quartz flags. Bits that are not modifiers are ignored.
    pub fn from_event_flags(flags: u64) -> Self {
        EVENT_FLAG_MAP
            .iter()
            .filter(|(_, bit)| flags & bit != 0)
            .fold(ModifierSet::empty(), |set, (modifier, _)| set | *modifier)
    }

    /// Reduced Carbon encoding. Function, numeric-pad and help are dropped.
    pub fn to_carbon_flags(self) -> u32 {
        CARBON_FLAG_MAP
            .iter()
            .filter(|(modifier, _)| self.contains(*modifier))
            .fold(0, |flags, (_, bit)| flags | bit)
    }

    pub fn from_carbon_flags(flags: u32) -> Self {
        CARBON_FLAG_MAP
            .iter()
            .filter(|(_, bit)| flags & bit != 0)
            .fold(ModifierSet::empty(), |set, (modifier, _)| set | *modifier)
    }

    /// Parses a single modifier name such as `ctrl` or `option`.
    pub fn parse_name(name: &str) -> Option<Self> {
        let modifier = match name.trim().to_lowercase().as_str() {
            "shift" => ModifierSet::SHIFT,
            "ctrl" | "control" => ModifierSet::CONTROL,
            "alt" | "opt" | "option" => ModifierSet::OPTION,
            "cmd" | "command" | "meta" | "super" => ModifierSet::COMMAND,
            "capslock" | "caps_lock" => ModifierSet::CAPS_LOCK,
            "fn" | "function" => ModifierSet::FUNCTION,
            "numpad" | "numeric_pad" => ModifierSet::NUMERIC_PAD,
            "help" => ModifierSet::HELP,
            _ => return None,
        };
        Some(modifier)
    }

    /// The modifier key that produces this flag, for single-flag sets.
    pub fn key(self) -> Option<Key> {
        [
            (ModifierSet::SHIFT, Key::SHIFT),
            (ModifierSet::CONTROL, Key::CONTROL),
            (ModifierSet::OPTION, Key::OPTION),
            (ModifierSet::COMMAND, Key::COMMAND),
            (ModifierSet::CAPS_LOCK, Key::CAPS_LOCK),
            (ModifierSet::FUNCTION, Key::FUNCTION),
        ]
        .into_iter()
        .find(|(modifier, _)| *modifier == self)
        .map(|(_, key)| key)
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("no modifiers");
        }
        let names = [
            (ModifierSet::CONTROL, "ctrl"),
            (ModifierSet::OPTION, "option"),
            (ModifierSet::SHIFT, "shift"),
            (ModifierSet::COMMAND, "cmd"),
            (ModifierSet::CAPS_LOCK, "capslock"),
            (ModifierSet::FUNCTION, "fn"),
            (ModifierSet::NUMERIC_PAD, "numpad"),
            (ModifierSet::HELP, "help"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(modifier, _)| self.contains(*modifier))
            .map(|(_, name)| *name)
            .collect();
        f.write_str(&parts.join("+"))
    }
}

impl fmt::Debug for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        write!(f, "{}", self.0)
    }
}

/// Parses a chord like `cmd+shift+s` into a key and its modifiers.
///
/// A lone modifier name (`shift`) is taken as the modifier key itself. When
/// every part names a modifier, the last part is the key, so `cmd+help` and
/// `shift+fn` reach the Help and Function keys.
pub fn parse_chord(chord: &str) -> Result<(Key, ModifierSet)> {
    let parts: Vec<&str> = chord.split('+').map(|s| s.trim()).collect();

    if parts.iter().all(|p| p.is_empty()) {
        return Err(DispatchError::invalid_key_combination(
            chord,
            "empty key combination",
        ));
    }

    if let [single] = parts.as_slice() {
        return Ok((Key::from_name(single)?, ModifierSet::empty()));
    }

    let mut modifier_parts = Vec::with_capacity(parts.len());
    let mut key = None;

    for part in &parts {
        if part.is_empty() {
            return Err(DispatchError::invalid_key_combination(
                chord,
                "empty component",
            ));
        }
        if let Some(modifier) = ModifierSet::parse_name(part) {
            modifier_parts.push((*part, modifier));
            continue;
        }
        if key.is_some() {
            return Err(DispatchError::invalid_key_combination(
                chord,
                "multiple non-modifier keys specified",
            ));
        }
        key = Some(Key::from_name(part)?);
    }

    let key = match key {
        Some(key) => key,
        None => {
            let (last, _) = modifier_parts.pop().ok_or_else(|| {
                DispatchError::invalid_key_combination(chord, "no key specified")
            })?;
            Key::from_name(last)?
        }
    };

    let modifiers = modifier_parts
        .iter()
        .fold(ModifierSet::empty(), |set, (_, modifier)| set | *modifier);

    Ok((key, modifiers))
}
