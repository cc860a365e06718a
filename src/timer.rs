//! Hold-to-start timer.
//!
//! Every input carries the instant it happened at, so the machine never reads
//! the clock itself except to stamp finished solves. The two periodic tickers
//! (inspection countdown and running clock) live here and nowhere else.

use crate::display::{DisplayFrame, Emphasis, Hints, Phase, Readout, HOLD_HINTS, STATUS_PENALTY};
use crate::scramble::{Scramble, ScrambleGenerator};
use crate::solve::SolveRecord;
use crate::ticker::{self, Ticker};
use crate::util::format_secs;
use chrono::Utc;
use std::time::{Duration, Instant};

/// Minimum continuous hold before a release counts as a start
pub const MIN_HOLD: Duration = Duration::from_millis(300);
pub const CLOCK_PERIOD: Duration = Duration::from_millis(10);
pub const INSPECTION_PERIOD: Duration = Duration::from_secs(1);
pub const INSPECTION_SECS: u32 = 15;
/// Countdown values below this are shown as a warning
pub const INSPECTION_WARNING_BELOW: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inspection {
    Inactive,
    Counting { remaining: u32 },
    Overtime,
}

impl Inspection {
    pub fn is_active(&self) -> bool {
        !matches!(self, Inspection::Inactive)
    }

    pub fn is_counting(&self) -> bool {
        matches!(self, Inspection::Counting { .. })
    }
}

#[derive(Debug, Clone)]
enum State {
    Idle,
    Armed { pressed_at: Instant, ready: bool },
    Running { started_at: Instant, scramble: Scramble },
}

/// Result of feeding one input to the machine
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Ignored,
    Armed,
    ReleasedEarly { held: Duration },
    Started,
    Stopped(SolveRecord),
    Ticked,
}

/// Run-time state of the single active timer
#[derive(Debug)]
pub struct TimerSession {
    state: State,
    inspection: Inspection,
    inspection_enabled: bool,
    scramble: Scramble,
    scramble_length: usize,
    readout: Readout,
    emphasis: Emphasis,
    hints: Hints,
    hint: String,
    status: String,
    inspection_ticker: Option<Ticker>,
    clock_ticker: Option<Ticker>,
}

/// Wall-clock delta at the millisecond resolution the timer reports
fn millis_between(from: Instant, to: Instant) -> Duration {
    let delta = to.saturating_duration_since(from);
    Duration::from_millis(delta.as_millis() as u64)
}

/// Seconds between two instants, counted in whole milliseconds
fn seconds_between(from: Instant, to: Instant) -> f64 {
    millis_between(from, to).as_millis() as f64 / 1000.0
}

impl TimerSession {
    pub fn new(inspection_enabled: bool, scramble_length: usize) -> Self {
        Self {
            state: State::Idle,
            inspection: Inspection::Inactive,
            inspection_enabled,
            scramble: ScrambleGenerator::generate(scramble_length),
            scramble_length,
            readout: Readout::Seconds(0.0),
            emphasis: Emphasis::Normal,
            hints: HOLD_HINTS,
            hint: HOLD_HINTS.idle.to_string(),
            status: String::new(),
            inspection_ticker: None,
            clock_ticker: None,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            State::Idle => Phase::Idle,
            State::Armed { ready: false, .. } => Phase::Armed,
            State::Armed { ready: true, .. } => Phase::Ready,
            State::Running { .. } => Phase::Running,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    pub fn inspection(&self) -> Inspection {
        self.inspection
    }

    pub fn inspection_enabled(&self) -> bool {
        self.inspection_enabled
    }

    pub fn current_scramble(&self) -> &Scramble {
        &self.scramble
    }

    /// Number of live periodic tickers; zero whenever nothing is counting
    pub fn active_tickers(&self) -> usize {
        usize::from(self.inspection_ticker.is_some()) + usize::from(self.clock_ticker.is_some())
    }

    pub fn frame(&self) -> DisplayFrame {
        DisplayFrame {
            phase: self.phase(),
            readout: self.readout,
            emphasis: self.emphasis,
            hint: self.hint.clone(),
            status: self.status.clone(),
        }
    }

    pub fn key_down(&mut self, at: Instant) -> Transition {
        match self.state {
            State::Idle => {
                self.state = State::Armed {
                    pressed_at: at,
                    ready: false,
                };
                self.hint = self.hints.holding.to_string();
                self.status.clear();

                // overtime has no ticker left, so a re-arm counts down afresh
                if self.inspection_enabled && !self.inspection.is_counting() {
                    self.start_inspection(at);
                }
                Transition::Armed
            }
            // auto-repeat while holding, or a press during a solve
            State::Armed { .. } | State::Running { .. } => Transition::Ignored,
        }
    }

    pub fn key_up(&mut self, at: Instant) -> Transition {
        match self.state {
            State::Idle => Transition::Ignored,
            State::Armed { pressed_at, .. } => {
                let held = millis_between(pressed_at, at);
                if held >= MIN_HOLD {
                    self.start_clock(at);
                    Transition::Started
                } else {
                    log::debug!("released after {:?}, arm discarded", held);
                    self.state = State::Idle;
                    self.hint = format!(
                        "Released too early ({}s)",
                        format_secs(held.as_secs_f64())
                    );
                    Transition::ReleasedEarly { held }
                }
            }
            State::Running { .. } => Transition::Stopped(self.stop_clock(at)),
        }
    }

    /// Advance whichever tickers are live
    pub fn tick(&mut self, at: Instant) -> Transition {
        let mut changed = false;

        if let State::Armed { pressed_at, ready } = &mut self.state {
            if !*ready && millis_between(*pressed_at, at) >= MIN_HOLD {
                *ready = true;
                self.hint = self.hints.ready.to_string();
                changed = true;
            }
        }

        let due = self
            .inspection_ticker
            .as_mut()
            .map_or(0, |ticker| ticker.poll(at));
        for _ in 0..due {
            self.advance_inspection();
            changed = true;
        }

        if let State::Running { started_at, .. } = self.state {
            if self.clock_ticker.as_mut().map_or(0, |t| t.poll(at)) > 0 {
                self.readout = Readout::Seconds(seconds_between(started_at, at));
                changed = true;
            }
        }

        if changed {
            Transition::Ticked
        } else {
            Transition::Ignored
        }
    }

    /// Swap in a fresh scramble. Refused while a solve is running.
    pub fn request_new_scramble(&mut self) -> bool {
        if self.is_running() {
            return false;
        }
        self.scramble = ScrambleGenerator::generate(self.scramble_length);
        true
    }

    /// Takes effect at the next arm. Refused while a solve is running.
    pub fn set_inspection(&mut self, enabled: bool) -> bool {
        if self.is_running() {
            return false;
        }
        self.inspection_enabled = enabled;
        true
    }

    /// Switch prompt texts, rewording the prompt on screen unless it is feedback
    pub fn set_hints(&mut self, hints: Hints) {
        let previous = std::mem::replace(&mut self.hints, hints);
        let texts = [
            (previous.idle, hints.idle),
            (previous.holding, hints.holding),
            (previous.ready, hints.ready),
            (previous.running, hints.running),
        ];
        if let Some((_, text)) = texts.iter().find(|(old, _)| *old == self.hint) {
            self.hint = text.to_string();
        }
    }

    fn start_inspection(&mut self, at: Instant) {
        self.inspection = Inspection::Counting {
            remaining: INSPECTION_SECS,
        };
        self.readout = Readout::Seconds(INSPECTION_SECS as f64);
        self.emphasis = Emphasis::Inspection;
        self.inspection_ticker = Some(Ticker::start(INSPECTION_PERIOD, at));
    }

    fn advance_inspection(&mut self) {
        match self.inspection {
            Inspection::Counting { remaining: 0 } => {
                self.inspection = Inspection::Overtime;
                ticker::cancel(&mut self.inspection_ticker);
                self.readout = Readout::Penalty;
                self.emphasis = Emphasis::Warning;
                self.status = STATUS_PENALTY.to_string();
            }
            Inspection::Counting { remaining } => {
                let remaining = remaining - 1;
                self.inspection = Inspection::Counting { remaining };
                self.readout = Readout::Seconds(remaining as f64);
                if remaining < INSPECTION_WARNING_BELOW {
                    self.emphasis = Emphasis::Warning;
                }
            }
            Inspection::Overtime | Inspection::Inactive => {
                ticker::cancel(&mut self.inspection_ticker);
            }
        }
    }

    fn start_clock(&mut self, at: Instant) {
        ticker::cancel(&mut self.inspection_ticker);
        self.inspection = Inspection::Inactive;

        self.state = State::Running {
            started_at: at,
            scramble: self.scramble.clone(),
        };
        self.readout = Readout::Seconds(0.0);
        self.emphasis = Emphasis::Normal;
        self.hint = self.hints.running.to_string();
        self.status.clear();
        self.clock_ticker = Some(Ticker::start(CLOCK_PERIOD, at));
    }

    fn stop_clock(&mut self, at: Instant) -> SolveRecord {
        ticker::cancel(&mut self.clock_ticker);

        let state = std::mem::replace(&mut self.state, State::Idle);
        let (started_at, scramble) = match state {
            State::Running {
                started_at,
                scramble,
            } => (started_at, scramble),
            _ => (at, self.scramble.clone()),
        };

        let elapsed = seconds_between(started_at, at);
        self.readout = Readout::Seconds(elapsed);
        self.hint = self.hints.idle.to_string();
        self.status = format!("Time: {}s", format_secs(elapsed));
        self.scramble = ScrambleGenerator::generate(self.scramble_length);

        SolveRecord::new(elapsed, scramble, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{HINT_IDLE, HINT_READY, HINT_RUNNING, TAP_HINTS};
    use assert_matches::assert_matches;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn start_solve(timer: &mut TimerSession, t0: Instant) {
        assert_eq!(timer.key_down(t0), Transition::Armed);
        assert_eq!(timer.key_up(t0 + MIN_HOLD), Transition::Started);
    }

    #[test]
    fn test_new_session_is_idle() {
        let timer = TimerSession::new(true, 25);

        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.current_scramble().len(), 25);
        assert_eq!(timer.active_tickers(), 0);
        assert_eq!(timer.frame().hint, HINT_IDLE);
    }

    #[test]
    fn test_hold_of_290ms_does_not_start() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();

        timer.key_down(t0);
        let outcome = timer.key_up(t0 + ms(290));

        assert_eq!(outcome, Transition::ReleasedEarly { held: ms(290) });
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.frame().hint, "Released too early (0.29s)");
        assert_eq!(timer.active_tickers(), 0);
    }

    #[test]
    fn test_hold_of_300ms_starts() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();

        timer.key_down(t0);
        assert_eq!(timer.key_up(t0 + ms(300)), Transition::Started);
        assert_eq!(timer.phase(), Phase::Running);
        assert_eq!(timer.frame().hint, HINT_RUNNING);
        assert_eq!(timer.active_tickers(), 1);
    }

    #[test]
    fn test_ready_after_dwell_on_tick() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();

        timer.key_down(t0);
        assert_eq!(timer.tick(t0 + ms(100)), Transition::Ignored);
        assert_eq!(timer.phase(), Phase::Armed);
        assert_eq!(timer.tick(t0 + ms(300)), Transition::Ticked);
        assert_eq!(timer.phase(), Phase::Ready);
        assert_eq!(timer.frame().hint, HINT_READY);
    }

    #[test]
    fn test_repeated_key_down_while_armed_keeps_press_instant() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();

        timer.key_down(t0);
        assert_eq!(timer.key_down(t0 + ms(200)), Transition::Ignored);
        assert_eq!(timer.key_up(t0 + ms(300)), Transition::Started);
    }

    #[test]
    fn test_stop_records_elapsed_and_starting_scramble() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();
        let scramble = timer.current_scramble().clone();

        start_solve(&mut timer, t0);
        let started = t0 + MIN_HOLD;
        let outcome = timer.key_up(started + ms(12_346));
        let expected = 12.346;

        assert_matches!(outcome, Transition::Stopped(record) => {
            assert_eq!(record.elapsed_seconds, expected);
            assert_eq!(record.scramble, scramble);
        });
        assert_eq!(timer.phase(), Phase::Idle);
        assert_eq!(timer.active_tickers(), 0);
        assert_eq!(timer.frame().status, "Time: 12.35s");
        assert_eq!(timer.frame().readout, Readout::Seconds(expected));
        assert_ne!(timer.current_scramble(), &scramble);
    }

    #[test]
    fn test_key_down_while_running_is_noop() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();
        start_solve(&mut timer, t0);

        for i in 1..5 {
            assert_eq!(timer.key_down(t0 + ms(400 * i)), Transition::Ignored);
            assert_eq!(timer.phase(), Phase::Running);
            assert_eq!(timer.active_tickers(), 1);
        }
    }

    #[test]
    fn test_scramble_and_inspection_locked_while_running() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();
        let scramble = timer.current_scramble().clone();
        start_solve(&mut timer, t0);

        assert!(!timer.request_new_scramble());
        assert!(!timer.set_inspection(true));
        assert_eq!(timer.current_scramble(), &scramble);
        assert!(!timer.inspection_enabled());
    }

    #[test]
    fn test_new_scramble_when_idle() {
        let mut timer = TimerSession::new(false, 10);
        assert!(timer.request_new_scramble());
        assert_eq!(timer.current_scramble().len(), 10);
    }

    #[test]
    fn test_clock_reads_wall_delta_on_tick() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();
        start_solve(&mut timer, t0);
        let started = t0 + MIN_HOLD;

        assert_eq!(timer.tick(started + ms(5)), Transition::Ignored);
        assert_eq!(timer.tick(started + ms(1234)), Transition::Ticked);
        assert_eq!(
            timer.frame().readout,
            Readout::Seconds(1.234)
        );
    }

    #[test]
    fn test_inspection_starts_on_arm() {
        let mut timer = TimerSession::new(true, 25);
        let t0 = Instant::now();

        timer.key_down(t0);

        assert_eq!(
            timer.inspection(),
            Inspection::Counting {
                remaining: INSPECTION_SECS
            }
        );
        assert_eq!(timer.frame().readout, Readout::Seconds(15.0));
        assert_eq!(timer.frame().emphasis, Emphasis::Inspection);
        assert_eq!(timer.active_tickers(), 1);
    }

    #[test]
    fn test_inspection_countdown_warning_and_overtime() {
        let mut timer = TimerSession::new(true, 25);
        let t0 = Instant::now();
        timer.key_down(t0);
        timer.key_up(t0 + ms(100));

        timer.tick(t0 + Duration::from_secs(11));
        assert_eq!(timer.frame().readout, Readout::Seconds(4.0));
        assert_eq!(timer.frame().emphasis, Emphasis::Inspection);

        timer.tick(t0 + Duration::from_secs(12));
        assert_eq!(timer.frame().readout, Readout::Seconds(3.0));
        assert_eq!(timer.frame().emphasis, Emphasis::Warning);

        timer.tick(t0 + Duration::from_secs(15));
        assert_eq!(timer.inspection(), Inspection::Counting { remaining: 0 });

        timer.tick(t0 + Duration::from_secs(16));
        assert_eq!(timer.inspection(), Inspection::Overtime);
        assert_eq!(timer.frame().readout, Readout::Penalty);
        assert_eq!(timer.frame().status, STATUS_PENALTY);
        assert_eq!(timer.active_tickers(), 0);
    }

    #[test]
    fn test_early_release_keeps_inspection_counting() {
        let mut timer = TimerSession::new(true, 25);
        let t0 = Instant::now();

        timer.key_down(t0);
        timer.key_up(t0 + ms(100));
        timer.tick(t0 + Duration::from_secs(2));
        assert_eq!(timer.inspection(), Inspection::Counting { remaining: 13 });

        // re-arming does not restart the countdown
        timer.key_down(t0 + Duration::from_secs(3));
        timer.tick(t0 + Duration::from_secs(3));
        assert_eq!(timer.inspection(), Inspection::Counting { remaining: 12 });
        assert_eq!(timer.active_tickers(), 1);
    }

    #[test]
    fn test_valid_start_cancels_inspection() {
        let mut timer = TimerSession::new(true, 25);
        let t0 = Instant::now();

        start_solve(&mut timer, t0);

        assert_eq!(timer.inspection(), Inspection::Inactive);
        assert_eq!(timer.active_tickers(), 1);
        assert_eq!(timer.frame().readout, Readout::Seconds(0.0));
        assert_eq!(timer.frame().emphasis, Emphasis::Normal);

        // a late inspection period never fires once the clock runs
        timer.tick(t0 + Duration::from_secs(5));
        assert_eq!(timer.inspection(), Inspection::Inactive);
    }

    #[test]
    fn test_rearm_after_overtime_restarts_countdown() {
        let mut timer = TimerSession::new(true, 25);
        let t0 = Instant::now();
        timer.key_down(t0);
        timer.key_up(t0 + ms(100));
        timer.tick(t0 + Duration::from_secs(20));
        assert_eq!(timer.inspection(), Inspection::Overtime);
        assert_eq!(timer.active_tickers(), 0);

        let t1 = t0 + Duration::from_secs(30);
        timer.key_down(t1);
        assert_eq!(
            timer.inspection(),
            Inspection::Counting {
                remaining: INSPECTION_SECS
            }
        );
        assert_eq!(timer.active_tickers(), 1);
        let frame = timer.frame();
        assert_eq!(frame.readout, Readout::Seconds(15.0));
        assert_eq!(frame.emphasis, Emphasis::Inspection);
        assert!(frame.status.is_empty());

        timer.tick(t1 + Duration::from_secs(1));
        assert_eq!(timer.inspection(), Inspection::Counting { remaining: 14 });

        assert_eq!(timer.key_up(t1 + Duration::from_secs(2)), Transition::Started);
        assert_eq!(timer.inspection(), Inspection::Inactive);
        assert_eq!(timer.active_tickers(), 1);
    }

    #[test]
    fn test_no_orphan_tickers_after_full_cycles() {
        let mut timer = TimerSession::new(true, 25);
        let mut t = Instant::now();

        for _ in 0..3 {
            timer.key_down(t);
            timer.key_up(t + ms(50));
            t += Duration::from_secs(1);
            timer.key_down(t);
            timer.tick(t + ms(200));
            timer.key_up(t + ms(400));
            t += Duration::from_secs(10);
            timer.tick(t);
            assert_matches!(timer.key_up(t), Transition::Stopped(_));
            assert_eq!(timer.active_tickers(), 0);
            t += Duration::from_secs(1);
        }
    }

    #[test]
    fn test_inspection_toggle_applies_next_arm() {
        let mut timer = TimerSession::new(false, 25);
        assert!(timer.set_inspection(true));

        timer.key_down(Instant::now());
        assert!(timer.inspection().is_active());
    }

    #[test]
    fn test_tap_hints_follow_the_phase() {
        let mut timer = TimerSession::new(false, 25);
        timer.set_hints(TAP_HINTS);
        assert_eq!(timer.frame().hint, TAP_HINTS.idle);

        let t0 = Instant::now();
        timer.key_down(t0);
        assert_eq!(timer.frame().hint, TAP_HINTS.holding);
        timer.tick(t0 + MIN_HOLD);
        assert_eq!(timer.frame().hint, TAP_HINTS.ready);
        timer.key_up(t0 + MIN_HOLD);
        assert_eq!(timer.frame().hint, TAP_HINTS.running);
        timer.key_up(t0 + Duration::from_secs(5));
        assert_eq!(timer.frame().hint, TAP_HINTS.idle);
    }

    #[test]
    fn test_switching_hints_keeps_early_release_feedback() {
        let mut timer = TimerSession::new(false, 25);
        let t0 = Instant::now();
        timer.key_down(t0);
        timer.key_up(t0 + ms(120));

        timer.set_hints(TAP_HINTS);
        assert_eq!(timer.frame().hint, "Released too early (0.12s)");
    }

    #[test]
    fn test_key_up_when_idle_ignored() {
        let mut timer = TimerSession::new(false, 25);
        assert_eq!(timer.key_up(Instant::now()), Transition::Ignored);
    }
}
