use crate::scramble::Scramble;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed solve. Built once when a running timer stops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveRecord {
    #[serde(rename = "time")]
    pub elapsed_seconds: f64,
    pub scramble: Scramble,
    pub timestamp: DateTime<Utc>,
}

impl SolveRecord {
    pub fn new(elapsed_seconds: f64, scramble: Scramble, timestamp: DateTime<Utc>) -> Self {
        Self {
            elapsed_seconds,
            scramble,
            timestamp,
        }
    }
}

/// Append-only, chronologically ordered list of solves
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionHistory {
    records: Vec<SolveRecord>,
}

impl SessionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: SolveRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[SolveRecord] {
        &self.records
    }

    pub fn times(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.elapsed_seconds).collect()
    }

    pub fn last(&self) -> Option<&SolveRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<SolveRecord>> for SessionHistory {
    fn from(records: Vec<SolveRecord>) -> Self {
        Self { records }
    }
}
