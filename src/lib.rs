//! # Key Dispatch
//!
//! Synthesizes keyboard events and delivers them to a single running
//! process or to the system-wide input stream.
//!
//! ## Features
//!
//! - Physical keys and modifier sets with Quartz and Carbon flag encodings
//! - Character resolution against the keyboard layout (bare, Shift, Option,
//!   Shift+Option), so text can be typed key by key
//! - Key events that build their native encodings lazily and cache them
//! - Delivery to a process by PID or name, to the focused process, or
//!   globally, with optional launch-and-retry for applications that are not
//!   running yet
//! - JSON configuration file support
//!
//! ## Example
//!
//! ```no_run
//! use key_dispatch::{CharacterResolver, DispatchConfig, Dispatcher, KeySender, TextStyle, UsLayout};
//!
//! let resolver = CharacterResolver::new(UsLayout::new());
//! let mut dispatcher = Dispatcher::native(DispatchConfig::default()).unwrap();
//!
//! // Save, then type a note
//! KeySender::press_chord("cmd+s").unwrap().send_to_app(&mut dispatcher, "TextEdit").unwrap();
//! KeySender::from_text("Done!", &resolver, TextStyle::Press)
//!     .send_globally(&dispatcher)
//!     .unwrap();
//! ```
//!
//! ## Configuration
//!
//! ```json
//! {
//!   "send_key_up": true,
//!   "text_style": "press",
//!   "failure_policy": "best_effort",
//!   "max_launch_attempts": 2,
//!   "launch_settle_delay": "1s"
//! }
//! ```

pub mod backend;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod key_code;
pub mod key_sender;
pub mod launcher;
pub mod layout;
pub mod modifiers;
pub mod process_finder;
pub mod resolver;
pub mod shortcut;

pub use backend::{
    default_backend, EventBackend, PostTarget, PostedEvent, RecordedNative, RecordingBackend,
};
pub use config::{DispatchConfig, FailurePolicy};
pub use dispatcher::{Dispatcher, SendReport};
pub use error::{DispatchError, Result};
pub use event::{EncodingState, EventKind, HighLevelEvent, KeyEvent, LowLevelEvent, NativeHandle};
pub use key_code::Key;
pub use key_sender::KeySender;
pub use launcher::{Launcher, SystemLauncher};
pub use layout::{LayoutLookup, UsLayout};
pub use modifiers::{parse_chord, ModifierSet};
pub use process_finder::{ProcessDirectory, ProcessFinder, ProcessHandle};
pub use resolver::{CharacterResolver, TextStyle};

#[cfg(target_os = "macos")]
pub use backend::QuartzBackend;
