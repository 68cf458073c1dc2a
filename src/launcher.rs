//! Application launching.

use std::process::Command;

use tracing::info;

use crate::error::{DispatchError, Result};

/// Starts an application by name.
///
/// `launch` blocks until the launch helper returns. The application may
/// still be registering as a running process at that point.
pub trait Launcher {
    fn launch(&mut self, application: &str) -> Result<()>;
}

/// Launches through the host's application opener.
///
/// macOS uses `open -a`, Windows uses `start`. Both helpers exit once the
/// application is started. Elsewhere there is no such helper: the
/// application binary is spawned directly, `launch` returns as soon as the
/// spawn succeeds, and a background thread reaps the child when it exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl Launcher for SystemLauncher {
    fn launch(&mut self, application: &str) -> Result<()> {
        info!(application, "launching application");

        #[cfg(any(target_os = "macos", windows))]
        {
            #[cfg(target_os = "macos")]
            let status = Command::new("open").arg("-a").arg(application).status();

            #[cfg(windows)]
            let status = Command::new("cmd")
                .args(["/C", "start", ""])
                .arg(application)
                .status();

            match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(DispatchError::launch_failed(
                    application,
                    format!("launcher exited with {status}"),
                )),
                Err(e) => Err(DispatchError::launch_failed(application, e.to_string())),
            }
        }

        #[cfg(not(any(target_os = "macos", windows)))]
        {
            spawn_detached(application)
        }
    }
}

#[cfg(not(any(target_os = "macos", windows)))]
fn spawn_detached(application: &str) -> Result<()> {
    let mut child = Command::new(application)
        .spawn()
        .map_err(|e| DispatchError::launch_failed(application, e.to_string()))?;
    let pid = child.id();
    std::thread::Builder::new()
        .name(format!("reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => tracing::debug!(pid, %status, "launched application exited"),
            Err(e) => tracing::warn!(pid, error = %e, "failed to wait for launched application"),
        })
        .map_err(|e| DispatchError::launch_failed(application, e.to_string()))?;
    Ok(())
}
