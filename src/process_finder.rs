//! Process discovery.
//!
//! This module finds running processes by name so key events can be posted
//! to them.

use std::fmt;

use sysinfo::{ProcessesToUpdate, System};
use tracing::debug;

use crate::error::Result;

/// A running process that can receive key events.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessHandle {
    pub pid: u32,
    pub name: String,
}

impl ProcessHandle {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

impl fmt::Display for ProcessHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (PID: {})", self.name, self.pid)
    }
}

/// Directory of running processes.
pub trait ProcessDirectory {
    fn find_running_process(&mut self, name: &str) -> Result<Option<ProcessHandle>>;

    fn frontmost_process(&mut self) -> Result<Option<ProcessHandle>>;

    fn all_running_processes(&mut self) -> Result<Vec<ProcessHandle>>;
}

/// Finds processes by name.
///
/// Uses the `sysinfo` crate to enumerate running processes. Names match
/// case-insensitively; an exact match wins over a substring match, and ties
/// go to the lowest PID.
///
/// # Example
///
/// ```
/// use key_dispatch::{ProcessDirectory, ProcessFinder};
///
/// let mut finder = ProcessFinder::new();
/// match finder.find_running_process("TextEdit") {
///     Ok(Some(process)) => println!("Found {}", process),
///     Ok(None) => println!("Process not found"),
///     Err(e) => eprintln!("Error: {}", e),
/// }
/// ```
pub struct ProcessFinder {
    system: System,
}

impl Clone for ProcessFinder {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl Default for ProcessFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessFinder {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    fn snapshot(&mut self) -> Vec<ProcessHandle> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        let mut processes: Vec<ProcessHandle> = self
            .system
            .processes()
            .iter()
            .map(|(pid, process)| {
                ProcessHandle::new(pid.as_u32(), process.name().to_string_lossy())
            })
            .collect();
        processes.sort_by_key(|p| p.pid);
        processes
    }
}

/// Picks the best match for `name` among `processes`.
pub fn match_process_name(processes: &[ProcessHandle], name: &str) -> Option<ProcessHandle> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }

    let exact = processes.iter().find(|p| {
        let candidate = p.name.to_lowercase();
        candidate == wanted
            || candidate.strip_suffix(".exe") == Some(wanted.as_str())
            || candidate.strip_suffix(".app") == Some(wanted.as_str())
    });

    exact
        .or_else(|| {
            processes
                .iter()
                .find(|p| p.name.to_lowercase().contains(&wanted))
        })
        .cloned()
}

impl ProcessDirectory for ProcessFinder {
    fn find_running_process(&mut self, name: &str) -> Result<Option<ProcessHandle>> {
        let processes = self.snapshot();
        let found = match_process_name(&processes, name);
        debug!(name, found = ?found, "process lookup");
        Ok(found)
    }

    fn frontmost_process(&mut self) -> Result<Option<ProcessHandle>> {
        let Some(pid) = frontmost_pid() else {
            return Ok(None);
        };
        let found = self.snapshot().into_iter().find(|p| p.pid == pid);
        debug!(pid, found = found.is_some(), "frontmost process");
        Ok(found)
    }

    fn all_running_processes(&mut self) -> Result<Vec<ProcessHandle>> {
        Ok(self.snapshot())
    }
}

/// PID owning the focused window.
#[cfg(windows)]
fn frontmost_pid() -> Option<u32> {
    use winapi::um::winuser::{GetForegroundWindow, GetWindowThreadProcessId};

    let mut pid: u32 = 0;
    // SAFETY: both calls accept a null/any window handle and only write `pid`.
    unsafe {
        let window = GetForegroundWindow();
        if window.is_null() {
            return None;
        }
        GetWindowThreadProcessId(window, &mut pid);
    }
    (pid != 0).then_some(pid)
}

/// PID owning the frontmost normal-layer window.
///
/// The on-screen window list is ordered front to back; the first window on
/// layer 0 belongs to the active application.
#[cfg(target_os = "macos")]
fn frontmost_pid() -> Option<u32> {
    use core_foundation::base::{CFType, TCFType};
    use core_foundation::dictionary::{CFDictionary, CFDictionaryRef};
    use core_foundation::number::CFNumber;
    use core_foundation::string::CFString;
    use core_graphics::window::{
        copy_window_info, kCGNullWindowID, kCGWindowListExcludeDesktopElements,
        kCGWindowListOptionOnScreenOnly,
    };

    let windows = copy_window_info(
        kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements,
        kCGNullWindowID,
    )?;
    let layer_key = CFString::from_static_string("kCGWindowLayer");
    let owner_key = CFString::from_static_string("kCGWindowOwnerPID");
    let number = |info: &CFDictionary<CFString, CFType>, key: &CFString| {
        info.find(key)
            .and_then(|value| value.downcast::<CFNumber>())
            .and_then(|n| n.to_i64())
    };

    windows.get_all_values().into_iter().find_map(|raw| {
        // SAFETY: every entry of the window list is a CFDictionary owned by
        // `windows`; the get rule retains it for the lifetime of `info`.
        let info: CFDictionary<CFString, CFType> =
            unsafe { CFDictionary::wrap_under_get_rule(raw as CFDictionaryRef) };
        if number(&info, &layer_key)? != 0 {
            return None;
        }
        number(&info, &owner_key).and_then(|pid| u32::try_from(pid).ok())
    })
}

#[cfg(not(any(windows, target_os = "macos")))]
fn frontmost_pid() -> Option<u32> {
    debug!("frontmost process lookup is not available on this platform");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<ProcessHandle> {
        vec![
            ProcessHandle::new(10, "TextEditHelper"),
            ProcessHandle::new(20, "TextEdit"),
            ProcessHandle::new(30, "notepad.exe"),
        ]
    }

    #[test]
    fn test_exact_match_preferred() {
        let found = match_process_name(&sample(), "textedit").unwrap();
        assert_eq!(found.pid, 20);
    }

    #[test]
    fn test_extension_and_substring_matches() {
        assert_eq!(match_process_name(&sample(), "notepad").unwrap().pid, 30);
        assert_eq!(match_process_name(&sample(), "helper").unwrap().pid, 10);
    }

    #[test]
    fn test_no_match() {
        assert!(match_process_name(&sample(), "Safari").is_none());
        assert!(match_process_name(&sample(), "  ").is_none());
    }

    #[test]
    fn test_frontmost_is_a_running_process() {
        let mut finder = ProcessFinder::new();
        let frontmost = finder.frontmost_process().unwrap();
        if let Some(process) = frontmost {
            let running = finder.all_running_processes().unwrap();
            assert!(running.iter().any(|p| p.pid == process.pid));
        }
    }
}
