use crate::util::format_secs;
use std::fmt;

pub const HINT_IDLE: &str = "Hold spacebar to start (0.3s to ready)";
pub const HINT_HOLDING: &str = "Hold to start...";
pub const HINT_READY: &str = "Release to start";
pub const HINT_RUNNING: &str = "Running... Release spacebar to stop";
pub const STATUS_PENALTY: &str = "Time will have +2 penalty";

/// Prompt texts for one way of driving the spacebar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hints {
    pub idle: &'static str,
    pub holding: &'static str,
    pub ready: &'static str,
    pub running: &'static str,
}

/// Press, hold and release
pub const HOLD_HINTS: Hints = Hints {
    idle: HINT_IDLE,
    holding: HINT_HOLDING,
    ready: HINT_READY,
    running: HINT_RUNNING,
};

/// Separate taps, for terminals that never report key releases
pub const TAP_HINTS: Hints = Hints {
    idle: "Tap spacebar to arm (0.3s to ready)",
    holding: "Wait for ready...",
    ready: "Tap to start",
    running: "Running... Tap spacebar to stop",
};

/// Externally visible timer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    Armed,
    Ready,
    Running,
}

/// What the big number on screen shows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Readout {
    Seconds(f64),
    Penalty,
}

impl fmt::Display for Readout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readout::Seconds(secs) => f.write_str(&format_secs(*secs)),
            Readout::Penalty => f.write_str("+2"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Normal,
    Inspection,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplayFrame {
    pub phase: Phase,
    pub readout: Readout,
    pub emphasis: Emphasis,
    pub hint: String,
    pub status: String,
}

/// Presentation boundary; the core pushes a fresh frame after every event
pub trait DisplaySink {
    fn show(&mut self, frame: &DisplayFrame);
}

/// Keeps the last frame around for a renderer to pick up
#[derive(Debug, Default)]
pub struct LatestFrame {
    pub frame: Option<DisplayFrame>,
    pub updates: usize,
}

impl DisplaySink for LatestFrame {
    fn show(&mut self, frame: &DisplayFrame) {
        self.frame = Some(frame.clone());
        self.updates += 1;
    }
}
