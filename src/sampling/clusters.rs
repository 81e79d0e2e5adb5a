//! Cluster detection over arrival timestamps.
//!
//! # Algorithm
//!
//! 1. Compute the gaps between consecutive arrivals.
//! 2. Threshold = mean of the 25th and 90th gap percentiles (linear
//!    interpolation between closest ranks).
//! 3. Start a new cluster wherever a gap is strictly greater than the
//!    threshold.
//!
//! Fewer than two arrivals need no threshold: zero or one cluster.

use crate::models::{ArrivalLog, TimeUnit};

/// Arrivals grouped into bursts.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAnalysis {
    clusters: Vec<Vec<TimeUnit>>,
    threshold: Option<f64>,
}

impl ClusterAnalysis {
    /// Clusters timestamps. Input in any order is sorted first.
    pub fn from_timestamps(timestamps: &[TimeUnit]) -> Self {
        let mut timestamps = timestamps.to_vec();
        timestamps.sort_unstable();

        if timestamps.len() < 2 {
            let clusters = if timestamps.is_empty() {
                Vec::new()
            } else {
                vec![timestamps]
            };
            return Self {
                clusters,
                threshold: None,
            };
        }

        let gaps: Vec<f64> = timestamps
            .windows(2)
            .map(|w| f64::from(w[1]) - f64::from(w[0]))
            .collect();
        let mut sorted = gaps.clone();
        sorted.sort_by(f64::total_cmp);
        let threshold = (percentile(&sorted, 25.0) + percentile(&sorted, 90.0)) / 2.0;

        let mut clusters = vec![vec![timestamps[0]]];
        for (gap, &t) in gaps.iter().zip(&timestamps[1..]) {
            if *gap > threshold {
                clusters.push(vec![t]);
            } else if let Some(current) = clusters.last_mut() {
                current.push(t);
            }
        }

        Self {
            clusters,
            threshold: Some(threshold),
        }
    }

    /// Clusters the arrivals of a recorded log.
    pub fn from_log(log: &ArrivalLog) -> Self {
        Self::from_timestamps(&log.timestamps())
    }

    pub fn clusters(&self) -> &[Vec<TimeUnit>] {
        &self.clusters
    }

    /// Gap threshold used for splitting, if one was computed.
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub fn count(&self) -> usize {
        self.clusters.len()
    }

    /// Longest span (last − first arrival) of any cluster.
    pub fn max_duration(&self) -> u32 {
        self.durations().max().unwrap_or(0)
    }

    /// Mean cluster span.
    pub fn mean_duration(&self) -> f64 {
        mean(self.durations().map(f64::from), self.count())
    }

    /// Most arrivals in one cluster.
    pub fn max_size(&self) -> usize {
        self.clusters.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Mean arrivals per cluster.
    pub fn mean_size(&self) -> f64 {
        mean(self.clusters.iter().map(|c| c.len() as f64), self.count())
    }

    /// Whether `t` falls within the span of some cluster.
    pub fn covers(&self, t: TimeUnit) -> bool {
        self.clusters.iter().any(|c| match (c.first(), c.last()) {
            (Some(&first), Some(&last)) => first <= t && t <= last,
            _ => false,
        })
    }

    fn durations(&self) -> impl Iterator<Item = u32> + '_ {
        self.clusters.iter().map(|c| match (c.first(), c.last()) {
            (Some(&first), Some(&last)) => last - first,
            _ => 0,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        values.sum::<f64>() / count as f64
    }
}

/// Percentile `q` (0..=100) of ascending, non-empty `sorted`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}
