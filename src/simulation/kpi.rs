//! Run performance metrics.
//!
//! Computes the five-number performance vector of a finished run from a
//! single line's queue and counters, and the scalar score used to rank
//! scenarios.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Extra duration | mean(completion - arrival - workload) over completed requests |
//! | Average active | Σ active requests per tick / total time units |
//! | Empty ticks | Ticks on which dispatch found no work |
//! | Occupancy | Latest active / queue length ratio |
//! | Peak active | Most active requests queued at once |

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div};
use tracing::warn;

use crate::config::SimulationConfig;
use crate::dispatching::ServiceLine;
use crate::error::{Result, SimError};
use crate::models::TimeUnit;

/// Performance of one run (or the average of many).
///
/// Counters are stored as `f64` so vectors from many samples can be summed
/// and averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceVector {
    /// Mean ticks lost beyond each completed request's workload.
    pub average_extra_duration: f64,
    /// Mean number of active requests per time unit.
    pub average_active: f64,
    /// Time units on which dispatch found no work.
    pub empty_ticks: f64,
    /// Latest active / queue length ratio (0.0..=1.0).
    pub occupancy: f64,
    /// Peak number of simultaneously active requests.
    pub peak_active: f64,
}

impl PerformanceVector {
    /// Computes the vector from a line after `total_time_units` ticks.
    ///
    /// # Errors
    /// [`SimError::NoCompletedRequests`] if no request on the line completed.
    pub fn from_line(line: &ServiceLine, total_time_units: TimeUnit) -> Result<Self> {
        let extras: Vec<i64> = line
            .requests()
            .iter()
            .filter_map(|r| r.extra_duration())
            .collect();

        if extras.is_empty() {
            warn!(line = %line.id(), policy = %line.policy(), "run finished without completed requests");
            return Err(SimError::NoCompletedRequests { line: line.id() });
        }

        let stats = line.stats();
        Ok(Self {
            average_extra_duration: extras.iter().sum::<i64>() as f64 / extras.len() as f64,
            average_active: stats.cumulative_active as f64 / f64::from(total_time_units),
            empty_ticks: stats.empty_ticks as f64,
            occupancy: stats.occupancy,
            peak_active: stats.peak_active as f64,
        })
    }

    /// The vector in its fixed order:
    /// `[extra, average active, empty ticks, occupancy, peak]`.
    pub fn to_array(&self) -> [f64; 5] {
        [
            self.average_extra_duration,
            self.average_active,
            self.empty_ticks,
            self.occupancy,
            self.peak_active,
        ]
    }

    /// Fraction of the timeline spent idle.
    pub fn idle_fraction(&self, total_time_units: TimeUnit) -> f64 {
        self.empty_ticks / f64::from(total_time_units)
    }

    /// Normalized total score. Higher is better.
    ///
    /// ```text
    /// score = - extra / (4 · max_workload)
    ///         - average_active / peak
    ///         + empty_ticks / T
    ///         - peak / (T / max_workload)
    ///         - occupancy
    /// ```
    pub fn score(&self, config: &SimulationConfig) -> f64 {
        let max_workload = f64::from(config.max_workload());
        let total = f64::from(config.total_time_units);
        let max_extra = 4.0 * max_workload;
        let max_queue_length = total / max_workload;

        -self.average_extra_duration / max_extra - self.average_active / self.peak_active
            + self.empty_ticks / total
            - self.peak_active / max_queue_length
            - self.occupancy
    }
}

impl Add for PerformanceVector {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            average_extra_duration: self.average_extra_duration + rhs.average_extra_duration,
            average_active: self.average_active + rhs.average_active,
            empty_ticks: self.empty_ticks + rhs.empty_ticks,
            occupancy: self.occupancy + rhs.occupancy,
            peak_active: self.peak_active + rhs.peak_active,
        }
    }
}

impl AddAssign for PerformanceVector {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Div<f64> for PerformanceVector {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self {
            average_extra_duration: self.average_extra_duration / rhs,
            average_active: self.average_active / rhs,
            empty_ticks: self.empty_ticks / rhs,
            occupancy: self.occupancy / rhs,
            peak_active: self.peak_active / rhs,
        }
    }
}
