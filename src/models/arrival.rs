//! Arrival log model.
//!
//! Every admission on a service line is recorded as an [`ArrivalRecord`].
//! Feeding a recorded log back into a fresh line or hierarchy replays the
//! exact same arrival pattern, which makes two dispatch policies strictly
//! comparable.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::TimeUnit;

/// One admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalRecord {
    /// Time unit of admission.
    pub time: TimeUnit,
    /// Workload (ticks) the request was admitted with.
    pub workload: u32,
    /// Priority flag.
    pub priority: bool,
    /// Whether the request was a delegating (chief) request.
    pub delegated: bool,
}

impl ArrivalRecord {
    pub fn new(time: TimeUnit, workload: u32, priority: bool) -> Self {
        Self {
            time,
            workload,
            priority,
            delegated: false,
        }
    }

    /// Marks the record as a delegating request.
    pub fn with_delegation(mut self, delegated: bool) -> Self {
        self.delegated = delegated;
        self
    }
}

/// Ordered record of admitted requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrivalLog {
    records: Vec<ArrivalRecord>,
}

impl ArrivalLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record.
    pub fn push(&mut self, record: ArrivalRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[ArrivalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Arrival time units, in log order.
    pub fn timestamps(&self) -> Vec<TimeUnit> {
        self.records.iter().map(|r| r.time).collect()
    }

    /// Indexes the log by time unit for replay.
    ///
    /// When several records share a time unit only the first one is kept:
    /// a tick admits at most one request.
    pub fn by_time(&self) -> BTreeMap<TimeUnit, ArrivalRecord> {
        let mut index = BTreeMap::new();
        for record in &self.records {
            index.entry(record.time).or_insert(*record);
        }
        index
    }

    /// Converts a chief-line log into one a single line can replay.
    ///
    /// A delegated record carries the per-collaborator share; the single
    /// line receives the whole request again, `share * (collaborators + 1)`,
    /// undelegated, saturating at `u32::MAX`. Plain records are kept rather
    /// than dropped, so a single line replays every request the hierarchy
    /// saw.
    pub fn flattened(&self, collaborators: usize) -> Self {
        let factor = u32::try_from(collaborators)
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        let records = self
            .records
            .iter()
            .map(|r| {
                if r.delegated {
                    ArrivalRecord::new(r.time, r.workload.saturating_mul(factor), r.priority)
                } else {
                    *r
                }
            })
            .collect();
        Self { records }
    }
}

impl FromIterator<ArrivalRecord> for ArrivalLog {
    fn from_iter<I: IntoIterator<Item = ArrivalRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}
