use crate::util::trailing_mean;
use serde::Serialize;

/// Derived summary of a time history. Never stored; always recomputed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    pub best: Option<f64>,
    pub worst: Option<f64>,
    pub count: usize,
    pub average_of_5: Option<f64>,
    pub average_of_12: Option<f64>,
}

impl Aggregates {
    /// Recompute every aggregate from the full ordered history
    pub fn recompute(times: &[f64]) -> Self {
        Self {
            best: times.iter().copied().reduce(f64::min),
            worst: times.iter().copied().reduce(f64::max),
            count: times.len(),
            average_of_5: average_of(times, 5),
            average_of_12: average_of(times, 12),
        }
    }

    pub fn is_personal_best(&self, time: f64) -> bool {
        self.best == Some(time)
    }
}

/// Plain arithmetic mean of the most recent `n` times (no trimming).
pub fn average_of(times: &[f64], n: usize) -> Option<f64> {
    trailing_mean(times, n)
}

/// One line in a history listing
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    /// 1-based position in the full history
    pub number: usize,
    pub time: f64,
    pub is_pb: bool,
}

/// The most recent `limit` times in chronological order, each flagged when it
/// equals the best time. Ties all flag.
pub fn recent_entries(times: &[f64], limit: usize) -> Vec<HistoryEntry> {
    let aggregates = Aggregates::recompute(times);
    let start = times.len().saturating_sub(limit);

    times[start..]
        .iter()
        .enumerate()
        .map(|(offset, &time)| HistoryEntry {
            number: start + offset + 1,
            time,
            is_pb: aggregates.is_personal_best(time),
        })
        .collect()
}
