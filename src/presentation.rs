//! Immersive mode and the display wake lock.

use std::cell::RefCell;
use std::io::{self, Write};
use std::process::{Child, Command, Stdio};
use std::rc::Rc;

use crossterm::{execute, terminal::SetTitle};
use tracing::debug;

use crate::error::{Capability, CapabilityError};

const TITLE_IDLE: &str = "reso";
const TITLE_SESSION: &str = "reso · méditation";

// xterm window operations: 10;1 enters full-screen, 10;0 leaves it.
const XTERM_FULLSCREEN_ON: &str = "\x1b[10;1t";
const XTERM_FULLSCREEN_OFF: &str = "\x1b[10;0t";

/// Handle for an acquired wake lock.
#[derive(Debug, PartialEq, Eq)]
pub struct WakeLock {
    id: u64,
}

impl WakeLock {
    pub fn id(&self) -> u64 {
        self.id
    }
}

pub trait PresentationMode {
    /// Idempotent.
    fn enter_immersive(&mut self) -> Result<(), CapabilityError>;
    /// Idempotent.
    fn exit_immersive(&mut self) -> Result<(), CapabilityError>;
    fn acquire_wake_lock(&mut self) -> Result<WakeLock, CapabilityError>;
    /// Releasing a stale handle is a no-op.
    fn release_wake_lock(&mut self, lock: WakeLock) -> Result<(), CapabilityError>;
}

#[cfg(target_os = "macos")]
fn inhibitor_command() -> Option<Command> {
    let mut cmd = Command::new("caffeinate");
    cmd.args(["-d", "-i"]);
    Some(cmd)
}

#[cfg(target_os = "linux")]
fn inhibitor_command() -> Option<Command> {
    let mut cmd = Command::new("systemd-inhibit");
    cmd.args([
        "--what=idle:sleep",
        "--who=reso",
        "--why=meditation session",
        "--mode=block",
        "sleep",
        "infinity",
    ]);
    Some(cmd)
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn inhibitor_command() -> Option<Command> {
    None
}

/// Terminal presentation: the window title plus the xterm full-screen
/// request, and an OS sleep inhibitor process as the wake lock.
#[derive(Debug, Default)]
pub struct TerminalPresentation {
    immersive: bool,
    inhibitor: Option<(u64, Child)>,
    next_lock_id: u64,
}

impl TerminalPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_mode(&self, title: &str, request: &str) -> io::Result<()> {
        let mut out = io::stdout();
        execute!(out, SetTitle(title))?;
        out.write_all(request.as_bytes())?;
        out.flush()
    }

    fn stop_inhibitor(child: &mut Child) -> io::Result<()> {
        match child.kill() {
            Ok(()) => {}
            // Already exited
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => {}
            Err(e) => return Err(e),
        }
        child.wait().map(|_| ())
    }
}

impl PresentationMode for TerminalPresentation {
    fn enter_immersive(&mut self) -> Result<(), CapabilityError> {
        if self.immersive {
            return Ok(());
        }
        self.write_mode(TITLE_SESSION, XTERM_FULLSCREEN_ON)
            .map_err(|e| CapabilityError::rejected(Capability::Immersive, e))?;
        self.immersive = true;
        Ok(())
    }

    fn exit_immersive(&mut self) -> Result<(), CapabilityError> {
        if !self.immersive {
            return Ok(());
        }
        self.immersive = false;
        self.write_mode(TITLE_IDLE, XTERM_FULLSCREEN_OFF)
            .map_err(|e| CapabilityError::rejected(Capability::Immersive, e))
    }

    fn acquire_wake_lock(&mut self) -> Result<WakeLock, CapabilityError> {
        if let Some((id, _)) = &self.inhibitor {
            return Ok(WakeLock { id: *id });
        }
        let mut cmd = inhibitor_command().ok_or_else(|| {
            CapabilityError::unavailable(Capability::WakeLock, "no sleep inhibitor on this platform")
        })?;
        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CapabilityError::unavailable(Capability::WakeLock, e))?;

        self.next_lock_id += 1;
        let id = self.next_lock_id;
        debug!(id, pid = child.id(), "sleep inhibitor started");
        self.inhibitor = Some((id, child));
        Ok(WakeLock { id })
    }

    fn release_wake_lock(&mut self, lock: WakeLock) -> Result<(), CapabilityError> {
        match self.inhibitor.take() {
            Some((id, mut child)) if id == lock.id => {
                Self::stop_inhibitor(&mut child)
                    .map_err(|e| CapabilityError::rejected(Capability::WakeLock, e))?;
                debug!(id, "sleep inhibitor stopped");
                Ok(())
            }
            other => {
                self.inhibitor = other;
                Ok(())
            }
        }
    }
}

impl Drop for TerminalPresentation {
    fn drop(&mut self) {
        if let Some((_, mut child)) = self.inhibitor.take() {
            let _ = Self::stop_inhibitor(&mut child);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationCall {
    EnterImmersive,
    ExitImmersive,
    AcquireWakeLock,
    ReleaseWakeLock(u64),
}

#[derive(Debug, Default)]
struct PresentationLog {
    calls: Vec<PresentationCall>,
    immersive: bool,
    held_lock: Option<u64>,
    next_lock_id: u64,
    fail_immersive: bool,
    fail_wake_lock: bool,
}

/// Presentation double that records every call. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresentation {
    log: Rc<RefCell<PresentationLog>>,
}

impl RecordingPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuses both immersive mode and the wake lock.
    pub fn unavailable() -> Self {
        let presentation = Self::new();
        {
            let mut log = presentation.log.borrow_mut();
            log.fail_immersive = true;
            log.fail_wake_lock = true;
        }
        presentation
    }

    pub fn calls(&self) -> Vec<PresentationCall> {
        self.log.borrow().calls.clone()
    }

    pub fn clear(&self) {
        self.log.borrow_mut().calls.clear();
    }

    pub fn is_immersive(&self) -> bool {
        self.log.borrow().immersive
    }

    pub fn holds_wake_lock(&self) -> bool {
        self.log.borrow().held_lock.is_some()
    }
}

impl PresentationMode for RecordingPresentation {
    fn enter_immersive(&mut self) -> Result<(), CapabilityError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(PresentationCall::EnterImmersive);
        if log.fail_immersive {
            return Err(CapabilityError::rejected(Capability::Immersive, "not allowed"));
        }
        log.immersive = true;
        Ok(())
    }

    fn exit_immersive(&mut self) -> Result<(), CapabilityError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(PresentationCall::ExitImmersive);
        log.immersive = false;
        Ok(())
    }

    fn acquire_wake_lock(&mut self) -> Result<WakeLock, CapabilityError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(PresentationCall::AcquireWakeLock);
        if log.fail_wake_lock {
            return Err(CapabilityError::unavailable(Capability::WakeLock, "not supported"));
        }
        log.next_lock_id += 1;
        let id = log.next_lock_id;
        log.held_lock = Some(id);
        Ok(WakeLock { id })
    }

    fn release_wake_lock(&mut self, lock: WakeLock) -> Result<(), CapabilityError> {
        let mut log = self.log.borrow_mut();
        log.calls.push(PresentationCall::ReleaseWakeLock(lock.id));
        if log.held_lock == Some(lock.id) {
            log.held_lock = None;
        }
        Ok(())
    }
}
