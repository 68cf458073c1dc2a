//! Custom error types for key-dispatch.
//!
//! Every failure here is recoverable: a send aborts on the first error, but
//! the events and their cached encodings stay valid for another attempt.

use std::io;
use thiserror::Error;

use crate::event::EventKind;
use crate::key_code::Key;
use crate::modifiers::ModifierSet;

/// Main error type for key-dispatch operations.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The native layer refused to build an encoding for a key event.
    #[error("could not create native event from key event ({kind} {key} with {modifiers})")]
    EventConstructionFailed {
        key: Key,
        modifiers: ModifierSet,
        kind: EventKind,
    },

    /// No running process matched the requested name.
    #[error("target '{name}' is not running")]
    TargetNotRunning { name: String },

    /// No supported modifier combination types the character.
    #[error("no key combination on the current layout types {character:?}")]
    CharacterUnresolvable { character: char },

    /// The specified key is invalid or unsupported.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// Error parsing a key combination.
    #[error("invalid key combination '{combo}': {reason}")]
    InvalidKeyCombination { combo: String, reason: String },

    /// The host refused to post an already constructed event.
    #[error("failed to post key event: {0}")]
    PostFailed(String),

    /// Launching the application failed before it could register.
    #[error("failed to launch '{name}': {reason}")]
    LaunchFailed { name: String, reason: String },

    /// Configuration validation error.
    #[error("configuration error: {0}")]
    ConfigValidation(String),

    /// Error reading or parsing configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    /// Error parsing duration string.
    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    /// Platform-specific operation is not supported.
    #[error("operation not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for key-dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// Create a new EventConstructionFailed error.
    pub fn construction_failed(key: Key, modifiers: ModifierSet, kind: EventKind) -> Self {
        Self::EventConstructionFailed {
            key,
            modifiers,
            kind,
        }
    }

    /// Create a new TargetNotRunning error.
    pub fn not_running(name: impl Into<String>) -> Self {
        Self::TargetNotRunning { name: name.into() }
    }

    /// Create a new CharacterUnresolvable error.
    pub fn unresolvable(character: char) -> Self {
        Self::CharacterUnresolvable { character }
    }

    /// Create a new InvalidKey error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidKeyCombination error.
    pub fn invalid_key_combination(combo: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKeyCombination {
            combo: combo.into(),
            reason: reason.into(),
        }
    }

    /// Create a new PostFailed error.
    pub fn post_failed(reason: impl Into<String>) -> Self {
        Self::PostFailed(reason.into())
    }

    /// Create a new LaunchFailed error.
    pub fn launch_failed(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LaunchFailed {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigValidation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation(message.into())
    }

    /// Create a new ConfigLoad error.
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new ConfigSave error.
    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a new InvalidDuration error.
    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a new UnsupportedPlatform error.
    pub fn unsupported_platform(message: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DispatchError::not_running("TextEdit");
        assert_eq!(err.to_string(), "target 'TextEdit' is not running");

        let err = DispatchError::invalid_key("xyz", "unknown key");
        assert_eq!(err.to_string(), "invalid key 'xyz': unknown key");

        let err = DispatchError::unresolvable('€');
        assert_eq!(
            err.to_string(),
            "no key combination on the current layout types '€'"
        );
    }

    #[test]
    fn test_construction_failed_names_event() {
        let err = DispatchError::construction_failed(Key::A, ModifierSet::SHIFT, EventKind::KeyDown);
        let message = err.to_string();
        assert!(message.starts_with("could not create native event from key event"));
        assert!(message.contains("keyDown"));
        assert!(message.contains("a"));
        assert!(message.contains("shift"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: DispatchError = io_err.into();
        assert!(matches!(err, DispatchError::Io(_)));
    }
}
