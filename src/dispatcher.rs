//! Event delivery.
//!
//! The [`Dispatcher`] posts key events to one process or to the global
//! input stream. Every send follows the same expansion rules:
//!
//! - `keyPress` always becomes a `keyDown`, `keyUp` pair;
//! - `keyDown` is followed by a fresh `keyUp` when `send_key_up` is set;
//! - `keyUp` is posted as is.
//!
//! Posting is not transactional. Under [`FailurePolicy::Strict`] the first
//! failure ends the send and events already posted stay posted.

use std::thread;

use tracing::{debug, info, warn};

use crate::backend::{default_backend, EventBackend, PostTarget};
use crate::config::{DispatchConfig, FailurePolicy};
use crate::error::{DispatchError, Result};
use crate::event::{EventKind, KeyEvent};
use crate::launcher::{Launcher, SystemLauncher};
use crate::process_finder::{ProcessDirectory, ProcessFinder, ProcessHandle};

/// Outcome of a send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendReport {
    /// Native events posted.
    pub posted: usize,
    /// Events skipped under the best-effort policy.
    pub failed: usize,
}

pub struct Dispatcher {
    backend: Box<dyn EventBackend>,
    directory: Box<dyn ProcessDirectory>,
    launcher: Box<dyn Launcher>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(
        backend: Box<dyn EventBackend>,
        directory: Box<dyn ProcessDirectory>,
        launcher: Box<dyn Launcher>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            backend,
            directory,
            launcher,
            config,
        }
    }

    /// Dispatcher wired to the platform backend, `sysinfo` and the system launcher.
    pub fn native(config: DispatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            default_backend()?,
            Box::new(ProcessFinder::new()),
            Box::new(SystemLauncher::new()),
            config,
        ))
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn backend(&self) -> &dyn EventBackend {
        self.backend.as_ref()
    }

    pub fn directory_mut(&mut self) -> &mut dyn ProcessDirectory {
        self.directory.as_mut()
    }

    pub fn send_to_process(
        &self,
        events: &[KeyEvent],
        process: &ProcessHandle,
    ) -> Result<SendReport> {
        debug!(target_process = %process, count = events.len(), "sending to process");
        self.post_all(events, PostTarget::Process(process.pid))
    }

    pub fn send_globally(&self, events: &[KeyEvent]) -> Result<SendReport> {
        debug!(count = events.len(), "sending to global input stream");
        self.post_all(events, PostTarget::Global)
    }

    /// Sends to the running process matching `name`.
    pub fn send_to_app(&mut self, events: &[KeyEvent], name: &str) -> Result<SendReport> {
        let process = self
            .directory
            .find_running_process(name)?
            .ok_or_else(|| DispatchError::not_running(name))?;
        self.send_to_process(events, &process)
    }

    /// Sends to whichever process currently has focus.
    pub fn send_to_frontmost(&mut self, events: &[KeyEvent]) -> Result<SendReport> {
        let process = self
            .directory
            .frontmost_process()?
            .ok_or_else(|| DispatchError::not_running("frontmost application"))?;
        self.send_to_process(events, &process)
    }

    /// Sends to `name`, launching it first when it is not running.
    ///
    /// At most `max_launch_attempts` launches are made. After each launch the
    /// dispatcher waits `launch_settle_delay` and looks the application up
    /// again; if it never shows up the result is `TargetNotRunning`.
    pub fn open_and_send(&mut self, events: &[KeyEvent], name: &str) -> Result<SendReport> {
        let max_launches = self.config.max_launch_attempts.max(1);
        let mut launches = 0;

        loop {
            if let Some(process) = self.directory.find_running_process(name)? {
                return self.send_to_process(events, &process);
            }
            if launches >= max_launches {
                warn!(name, launches, "application did not appear after launching");
                return Err(DispatchError::not_running(name));
            }

            info!(name, attempt = launches + 1, "application not running, launching");
            self.launcher.launch(name)?;
            launches += 1;

            if !self.config.launch_settle_delay.is_zero() {
                thread::sleep(self.config.launch_settle_delay);
            }
        }
    }

    fn post_all(&self, events: &[KeyEvent], target: PostTarget) -> Result<SendReport> {
        let mut report = SendReport::default();
        for event in events {
            if let Err(e) = self.post_event(event, target, &mut report) {
                match self.config.failure_policy {
                    FailurePolicy::Strict => return Err(e),
                    FailurePolicy::BestEffort => {
                        warn!(%event, error = %e, "skipping event");
                        report.failed += 1;
                    }
                }
            }
        }
        Ok(report)
    }

    fn post_event(
        &self,
        event: &KeyEvent,
        target: PostTarget,
        report: &mut SendReport,
    ) -> Result<()> {
        match event.kind() {
            EventKind::KeyPress => {
                // Failures of either half are reported against the press itself.
                for part in event.expand() {
                    self.post_one(&part, target).map_err(|e| match e {
                        DispatchError::EventConstructionFailed { .. } => {
                            event.construction_failed()
                        }
                        other => other,
                    })?;
                    report.posted += 1;
                }
            }
            EventKind::KeyDown => {
                self.post_one(event, target)?;
                report.posted += 1;
                if self.config.send_key_up {
                    self.post_one(&event.with_kind(EventKind::KeyUp), target)?;
                    report.posted += 1;
                }
            }
            EventKind::KeyUp => {
                self.post_one(event, target)?;
                report.posted += 1;
            }
        }
        Ok(())
    }

    fn post_one(&self, event: &KeyEvent, target: PostTarget) -> Result<()> {
        let native = event.low_level(self.backend.as_ref())?;
        match target {
            PostTarget::Process(pid) => self.backend.post_to_process(&native, pid)?,
            PostTarget::Global => self.backend.post_globally(&native)?,
        }
        debug!(%event, ?target, "posted");

        if !self.config.event_delay.is_zero() {
            thread::sleep(self.config.event_delay);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{RecordedNative, RecordingBackend};
    use crate::key_code::Key;
    use crate::modifiers::ModifierSet;
    use std::sync::Arc;

    struct NoProcesses;

    impl ProcessDirectory for NoProcesses {
        fn find_running_process(&mut self, _name: &str) -> Result<Option<ProcessHandle>> {
            Ok(None)
        }

        fn frontmost_process(&mut self) -> Result<Option<ProcessHandle>> {
            Ok(None)
        }

        fn all_running_processes(&mut self) -> Result<Vec<ProcessHandle>> {
            Ok(Vec::new())
        }
    }

    struct NeverLaunch;

    impl Launcher for NeverLaunch {
        fn launch(&mut self, application: &str) -> Result<()> {
            Err(DispatchError::launch_failed(application, "not allowed in tests"))
        }
    }

    fn dispatcher(backend: &Arc<RecordingBackend>, config: DispatchConfig) -> Dispatcher {
        Dispatcher::new(
            Box::new(Arc::clone(backend)),
            Box::new(NoProcesses),
            Box::new(NeverLaunch),
            config,
        )
    }

    fn kinds(backend: &RecordingBackend) -> Vec<EventKind> {
        backend.posted().iter().map(|p| p.event.kind()).collect()
    }

    #[test]
    fn test_key_down_gets_paired_key_up() {
        let backend = Arc::new(RecordingBackend::new());
        let dispatcher = dispatcher(&backend, DispatchConfig::default());
        let events = [KeyEvent::new(Key::A, ModifierSet::SHIFT, EventKind::KeyDown)];

        let report = dispatcher.send_globally(&events).unwrap();
        assert_eq!(report, SendReport { posted: 2, failed: 0 });
        assert_eq!(kinds(&backend), vec![EventKind::KeyDown, EventKind::KeyUp]);
        assert!(backend
            .posted()
            .iter()
            .all(|p| p.event.modifiers() == ModifierSet::SHIFT && p.target == PostTarget::Global));
    }

    #[test]
    fn test_key_up_pairing_can_be_disabled() {
        let backend = Arc::new(RecordingBackend::new());
        let config = DispatchConfig {
            send_key_up: false,
            ..DispatchConfig::default()
        };
        let dispatcher = dispatcher(&backend, config);
        let events = [
            KeyEvent::new(Key::A, ModifierSet::empty(), EventKind::KeyDown),
            KeyEvent::new(Key::B, ModifierSet::empty(), EventKind::KeyPress),
        ];

        let process = ProcessHandle::new(7, "Notes");
        dispatcher.send_to_process(&events, &process).unwrap();
        assert_eq!(
            kinds(&backend),
            vec![EventKind::KeyDown, EventKind::KeyDown, EventKind::KeyUp]
        );
        assert!(backend
            .posted()
            .iter()
            .all(|p| p.target == PostTarget::Process(7)));
    }

    #[test]
    fn test_strict_aborts_without_rollback() {
        let backend = Arc::new(RecordingBackend::new());
        backend.refuse_key(Key::B);
        let dispatcher = dispatcher(&backend, DispatchConfig::default());
        let events = [
            KeyEvent::new(Key::A, ModifierSet::empty(), EventKind::KeyPress),
            KeyEvent::new(Key::B, ModifierSet::empty(), EventKind::KeyPress),
            KeyEvent::new(Key::C, ModifierSet::empty(), EventKind::KeyPress),
        ];

        let err = dispatcher.send_globally(&events).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::EventConstructionFailed { key: Key::B, .. }
        ));
        assert_eq!(backend.posted().len(), 2);
    }

    #[test]
    fn test_key_press_failure_names_the_press() {
        let backend = Arc::new(RecordingBackend::new());
        backend.refuse_key(Key::B);
        let dispatcher = dispatcher(&backend, DispatchConfig::default());
        let events = [KeyEvent::new(Key::B, ModifierSet::COMMAND, EventKind::KeyPress)];

        let err = dispatcher.send_globally(&events).unwrap_err();
        match &err {
            DispatchError::EventConstructionFailed {
                key,
                modifiers,
                kind,
            } => {
                assert_eq!(*key, Key::B);
                assert_eq!(*modifiers, ModifierSet::COMMAND);
                assert_eq!(*kind, EventKind::KeyPress);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(backend.posted().is_empty());
    }

    #[test]
    fn test_repeated_sends_reuse_native_event() {
        let backend = Arc::new(RecordingBackend::new());
        let config = DispatchConfig {
            send_key_up: false,
            ..DispatchConfig::default()
        };
        let dispatcher = dispatcher(&backend, config);
        let events = [KeyEvent::new(Key::F, ModifierSet::empty(), EventKind::KeyDown)];

        dispatcher.send_globally(&events).unwrap();
        dispatcher.send_globally(&events).unwrap();

        let serials: Vec<_> = backend
            .posted()
            .iter()
            .map(|p| p.event.native::<RecordedNative>().copied())
            .collect();
        assert_eq!(serials, vec![Some(RecordedNative { serial: 1 }); 2]);
        assert_eq!(backend.created_count(), 1);
    }

    #[test]
    fn test_best_effort_continues() {
        let backend = Arc::new(RecordingBackend::new());
        backend.refuse_key(Key::B);
        let config = DispatchConfig {
            failure_policy: FailurePolicy::BestEffort,
            ..DispatchConfig::default()
        };
        let dispatcher = dispatcher(&backend, config);
        let events = [
            KeyEvent::new(Key::A, ModifierSet::empty(), EventKind::KeyPress),
            KeyEvent::new(Key::B, ModifierSet::empty(), EventKind::KeyPress),
            KeyEvent::new(Key::C, ModifierSet::empty(), EventKind::KeyPress),
        ];

        let report = dispatcher.send_globally(&events).unwrap();
        assert_eq!(report, SendReport { posted: 4, failed: 1 });
        let keys: Vec<Key> = backend.posted().iter().map(|p| p.event.key()).collect();
        assert_eq!(keys, vec![Key::A, Key::A, Key::C, Key::C]);
    }

    #[test]
    fn test_missing_app_posts_nothing() {
        let backend = Arc::new(RecordingBackend::new());
        let mut dispatcher = dispatcher(&backend, DispatchConfig::default());
        let events = [KeyEvent::new(Key::A, ModifierSet::empty(), EventKind::KeyPress)];

        let err = dispatcher.send_to_app(&events, "Ghost").unwrap_err();
        assert!(matches!(err, DispatchError::TargetNotRunning { ref name } if name == "Ghost"));
        assert!(dispatcher.send_to_frontmost(&events).is_err());
        assert!(backend.posted().is_empty());
    }
}
