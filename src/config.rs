//! Dispatch configuration.
//!
//! Every field has a default, so `{}` is a valid configuration file:
//!
//! ```json
//! {
//!   "send_key_up": true,
//!   "text_style": "press",
//!   "failure_policy": "strict",
//!   "max_launch_attempts": 1,
//!   "launch_settle_delay": "500ms",
//!   "event_delay": "0ms"
//! }
//! ```

use std::fs;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::resolver::TextStyle;

/// What a multi-event send does when one event fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort on the first failure and return it.
    #[default]
    Strict,
    /// Log the failure, count it and carry on with the next event.
    BestEffort,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Post a paired key-up after every key-down event.
    #[serde(default = "default_send_key_up")]
    pub send_key_up: bool,

    #[serde(default)]
    pub text_style: TextStyle,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Launch cycles `open_and_send` may run before giving up.
    #[serde(default = "default_max_launch_attempts")]
    pub max_launch_attempts: u32,

    /// Pause after a launch before looking the application up again.
    #[serde(
        default = "default_launch_settle_delay",
        with = "duration_format"
    )]
    pub launch_settle_delay: Duration,

    /// Pause between consecutive posted events.
    #[serde(default, with = "duration_format")]
    pub event_delay: Duration,
}

fn default_send_key_up() -> bool {
    true
}

fn default_max_launch_attempts() -> u32 {
    1
}

fn default_launch_settle_delay() -> Duration {
    Duration::from_millis(500)
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            send_key_up: default_send_key_up(),
            text_style: TextStyle::default(),
            failure_policy: FailurePolicy::default(),
            max_launch_attempts: default_max_launch_attempts(),
            launch_settle_delay: default_launch_settle_delay(),
            event_delay: Duration::ZERO,
        }
    }
}

impl DispatchConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| DispatchError::config_load(path, e.to_string()))?;
        let config: DispatchConfig = serde_json::from_str(&content)
            .map_err(|e| DispatchError::config_load(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| DispatchError::config_save(path, e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_launch_attempts == 0 {
            return Err(DispatchError::config_validation(
                "max_launch_attempts must be at least 1",
            ));
        }
        if self.launch_settle_delay > Duration::from_secs(60) {
            return Err(DispatchError::config_validation(
                "launch_settle_delay cannot exceed 60s",
            ));
        }
        if self.event_delay > Duration::from_secs(10) {
            return Err(DispatchError::config_validation(
                "event_delay cannot exceed 10s",
            ));
        }
        Ok(())
    }
}

/// Parses `"500ms"`, `"2s"`, `"1m"` or bare milliseconds (`"1000"`).
pub fn parse_duration(value: &str) -> Result<Duration> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.is_empty() {
        return Err(DispatchError::invalid_duration(value, "empty duration"));
    }

    let (number, unit) = match trimmed.find(|c: char| !c.is_ascii_digit()) {
        Some(index) => trimmed.split_at(index),
        None => (trimmed.as_str(), "ms"),
    };

    if number.is_empty() {
        return Err(DispatchError::invalid_duration(value, "missing number"));
    }

    let amount: u64 = number
        .parse()
        .map_err(|_| DispatchError::invalid_duration(value, "number out of range"))?;

    match unit.trim() {
        "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => amount
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or_else(|| DispatchError::invalid_duration(value, "number out of range")),
        other => Err(DispatchError::invalid_duration(
            value,
            format!("unknown unit '{other}' (expected ms, s or m)"),
        )),
    }
}

mod duration_format {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let value = String::deserialize(deserializer)?;
        super::parse_duration(&value).map_err(serde::de::Error::custom)
    }
}
