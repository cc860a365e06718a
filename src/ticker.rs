use std::time::{Duration, Instant};

/// A cancelable repeating task. The owner polls it with the current instant
/// and it reports how many periods have come due since the last poll.
#[derive(Debug, Clone)]
pub struct Ticker {
    period: Duration,
    next_due: Instant,
}

impl Ticker {
    pub fn start(period: Duration, at: Instant) -> Self {
        Self {
            period,
            next_due: at + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of whole periods elapsed since the last poll
    pub fn poll(&mut self, now: Instant) -> u32 {
        let mut fired = 0;
        while now >= self.next_due {
            self.next_due += self.period;
            fired += 1;
        }
        fired
    }
}

/// Stops a ticker slot, returning whether one was live
pub fn cancel(slot: &mut Option<Ticker>) -> bool {
    slot.take().is_some()
}
