use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// How often the loop wakes up when no input arrives.
pub const TICK_RATE_MS: u64 = 100;

/// What the session loop reacts to.
#[derive(Clone, Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize,
    Tick,
}

/// Where input comes from: the terminal, or a channel in tests.
pub trait EventSource: Send + 'static {
    /// Waits at most `timeout`; `Err(Timeout)` means the loop should tick.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Reads crossterm events on a background thread.
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let forwarded = match event::read() {
                // Key releases only show up on some platforms
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Press => tx.send(AppEvent::Key(key)),
                Ok(CtEvent::Resize(_, _)) => tx.send(AppEvent::Resize),
                Ok(_) => Ok(()),
                Err(_) => break,
            };
            if forwarded.is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Channel-fed source for headless runs.
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Advances the app one input event at a time, or one tick when the input
/// stays quiet for `tick_rate`.
pub struct Runner<E: EventSource> {
    event_source: E,
    tick_rate: Duration,
}

impl<E: EventSource> Runner<E> {
    /// Ticks every [`TICK_RATE_MS`].
    pub fn new(event_source: E) -> Self {
        Self::with_tick_rate(event_source, Duration::from_millis(TICK_RATE_MS))
    }

    pub fn with_tick_rate(event_source: E, tick_rate: Duration) -> Self {
        Self {
            event_source,
            tick_rate,
        }
    }

    pub fn tick_rate(&self) -> Duration {
        self.tick_rate
    }

    /// Blocks up to the tick rate and returns the next event, or Tick on timeout.
    /// A closed source keeps ticking so a running countdown still finishes.
    pub fn step(&self) -> AppEvent {
        match self.event_source.recv_timeout(self.tick_rate) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => AppEvent::Tick,
        }
    }
}
