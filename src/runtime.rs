use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::display::{Hints, Phase, HOLD_HINTS, TAP_HINTS};

/// Space presses closer together than this are terminal autorepeat, not taps
pub const AUTOREPEAT_WINDOW: Duration = Duration::from_millis(100);

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum CubikEvent {
    Key(KeyEvent),
    Resize,
    Tick,
    /// The input source is gone; nothing more will arrive
    Closed,
}

/// Source of terminal events (keyboard, resize, etc.)
pub trait CubikEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<CubikEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<CubikEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            match event::read() {
                Ok(CtEvent::Key(key)) => {
                    if tx.send(CubikEvent::Key(key)).is_err() {
                        break;
                    }
                }
                Ok(CtEvent::Resize(_, _)) => {
                    if tx.send(CubikEvent::Resize).is_err() {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    log::error!("terminal event stream closed: {}", e);
                    break;
                }
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

impl CubikEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<CubikEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable tick cadence
pub trait TickRate: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

#[derive(Clone, Copy, Debug)]
pub struct FixedTickRate {
    interval: Duration,
}

impl FixedTickRate {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl TickRate for FixedTickRate {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<CubikEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<CubikEvent>) -> Self {
        Self { rx }
    }
}

impl CubikEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<CubikEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: CubikEventSource, T: TickRate> {
    event_source: E,
    tick_rate: T,
}

impl<E: CubikEventSource, T: TickRate> Runner<E, T> {
    pub fn new(event_source: E, tick_rate: T) -> Self {
        Self {
            event_source,
            tick_rate,
        }
    }

    /// Blocks up to tick interval and returns the next event, Tick on timeout,
    /// or Closed once the source has hung up
    pub fn step(&self) -> CubikEvent {
        match self.event_source.recv_timeout(self.tick_rate.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => CubikEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => CubikEvent::Closed,
        }
    }
}

/// What a key means to the app
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SpaceDown,
    SpaceUp,
    NewScramble,
    ToggleInspection,
    Quit,
}

/// How key releases are observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// The terminal reports press, repeat and release separately
    Native,
    /// Only presses arrive; the press that follows an arming press acts as the release
    Toggle,
}

impl ReleaseMode {
    pub fn hints(self) -> Hints {
        match self {
            ReleaseMode::Native => HOLD_HINTS,
            ReleaseMode::Toggle => TAP_HINTS,
        }
    }
}

/// Maps raw key events onto commands for the given timer phase
pub fn translate(key: &KeyEvent, phase: Phase, mode: ReleaseMode) -> Option<Command> {
    let running = phase == Phase::Running;

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return (key.kind == KeyEventKind::Press).then_some(Command::Quit);
    }

    match (key.code, key.kind, mode) {
        (KeyCode::Char(' '), KeyEventKind::Press, ReleaseMode::Native) => Some(Command::SpaceDown),
        (KeyCode::Char(' '), KeyEventKind::Release, ReleaseMode::Native) => Some(Command::SpaceUp),
        (KeyCode::Char(' '), KeyEventKind::Press, ReleaseMode::Toggle) => match phase {
            Phase::Idle => Some(Command::SpaceDown),
            Phase::Armed | Phase::Ready | Phase::Running => Some(Command::SpaceUp),
        },
        (_, KeyEventKind::Press, _) if running => None,
        (KeyCode::Char('n'), KeyEventKind::Press, _) => Some(Command::NewScramble),
        (KeyCode::Char('i'), KeyEventKind::Press, _) => Some(Command::ToggleInspection),
        (KeyCode::Char('q') | KeyCode::Esc, KeyEventKind::Press, _) => Some(Command::Quit),
        _ => None,
    }
}

/// Stateful front of `translate`.
///
/// In toggle mode a held spacebar arrives as a stream of presses. Any space
/// press within `AUTOREPEAT_WINDOW` of the previous one is swallowed, and the
/// window keeps sliding while the stream lasts, so holding the key acts as a
/// single tap.
#[derive(Debug, Clone)]
pub struct KeyTranslator {
    mode: ReleaseMode,
    last_space: Option<Instant>,
}

impl KeyTranslator {
    pub fn new(mode: ReleaseMode) -> Self {
        Self {
            mode,
            last_space: None,
        }
    }

    pub fn mode(&self) -> ReleaseMode {
        self.mode
    }

    pub fn translate(&mut self, key: &KeyEvent, phase: Phase, at: Instant) -> Option<Command> {
        let space_press = key.code == KeyCode::Char(' ') && key.kind == KeyEventKind::Press;
        if self.mode == ReleaseMode::Toggle && space_press {
            let previous = self.last_space.replace(at);
            if previous.is_some_and(|p| at.saturating_duration_since(p) < AUTOREPEAT_WINDOW) {
                log::trace!("space autorepeat dropped");
                return None;
            }
        }
        translate(key, phase, self.mode)
    }
}
