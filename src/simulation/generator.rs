//! Arrival generator.
//!
//! Decides, tick by tick, whether a request arrives and with which
//! parameters. Arrivals are either sampled from a [`SimulationConfig`] or
//! replayed from a recorded [`ArrivalLog`].
//!
//! Sampling draws, in order: arrival, workload (random model only),
//! priority (when enabled), delegation (hierarchies only).

use rand::Rng;
use std::collections::BTreeMap;

use crate::config::{SimulationConfig, WorkloadModel};
use crate::error::Result;
use crate::models::{ArrivalLog, ArrivalRecord, TimeUnit};

/// A request arriving on the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// Ticks of work. For a replayed delegated arrival this is the
    /// per-collaborator share that was recorded.
    pub workload: u32,
    pub priority: bool,
    /// Whether the request is split across collaborators.
    pub delegated: bool,
}

impl From<ArrivalRecord> for Arrival {
    fn from(record: ArrivalRecord) -> Self {
        Self {
            workload: record.workload,
            priority: record.priority,
            delegated: record.delegated,
        }
    }
}

#[derive(Debug, Clone)]
struct SampledArrivals {
    arrival_probability: f64,
    workload: WorkloadModel,
    priority_probability: Option<f64>,
    subrequest_probability: Option<f64>,
}

#[derive(Debug, Clone)]
enum Source {
    Sampled(SampledArrivals),
    Replay(BTreeMap<TimeUnit, ArrivalRecord>),
}

/// Per-tick arrival source.
#[derive(Debug, Clone)]
pub struct ArrivalGenerator {
    source: Source,
}

impl ArrivalGenerator {
    /// Samples arrivals from `config`. Delegation is never drawn; see
    /// [`with_delegation`](Self::with_delegation).
    ///
    /// # Errors
    /// [`SimError::Configuration`](crate::SimError) if the run parameters
    /// of `config` are invalid.
    pub fn sampled(config: &SimulationConfig) -> Result<Self> {
        config.validate_run()?;
        Ok(Self {
            source: Source::Sampled(SampledArrivals {
                arrival_probability: config.arrival_probability,
                workload: config.workload_model(),
                priority_probability: config
                    .random_priority
                    .then_some(config.priority_probability),
                subrequest_probability: None,
            }),
        })
    }

    /// Replays `log`: at most one arrival per time unit, the first logged.
    pub fn replay(log: &ArrivalLog) -> Self {
        Self {
            source: Source::Replay(log.by_time()),
        }
    }

    /// Also draws whether each sampled arrival is delegated. No effect on a
    /// replaying generator, which uses the logged flag.
    pub fn with_delegation(mut self, probability: f64) -> Self {
        if let Source::Sampled(sampled) = &mut self.source {
            sampled.subrequest_probability = Some(probability);
        }
        self
    }

    /// Whether arrivals come from a recorded log.
    pub fn is_replay(&self) -> bool {
        matches!(self.source, Source::Replay(_))
    }

    /// The arrival on tick `now`, if any.
    pub fn next_arrival<R: Rng>(&mut self, now: TimeUnit, rng: &mut R) -> Option<Arrival> {
        match &self.source {
            Source::Replay(index) => index.get(&now).map(|record| Arrival::from(*record)),
            Source::Sampled(sampled) => sampled.draw(rng),
        }
    }
}

impl SampledArrivals {
    fn draw<R: Rng>(&self, rng: &mut R) -> Option<Arrival> {
        if !rng.random_bool(self.arrival_probability) {
            return None;
        }
        let workload = match self.workload {
            WorkloadModel::Fixed(w) => w,
            WorkloadModel::Uniform { max } => rng.random_range(1..=max),
        };
        let priority = self
            .priority_probability
            .is_some_and(|p| rng.random_bool(p));
        let delegated = self
            .subrequest_probability
            .is_some_and(|p| rng.random_bool(p));
        Some(Arrival {
            workload,
            priority,
            delegated,
        })
    }
}
