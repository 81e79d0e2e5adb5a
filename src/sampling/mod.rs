//! Monte Carlo comparison of dispatch scenarios.
//!
//! Each sample runs every scenario once on the same arrival pattern: the
//! first scenario samples fresh arrivals, and every later scenario replays
//! the first one's arrival log (flattened back to whole requests for single
//! lines). Performance vectors are summed per scenario and averaged at the
//! end, then ranked by score.
//!
//! # Usage
//!
//! ```
//! use u_service_line::SimulationConfig;
//! use u_service_line::sampling::MonteCarlo;
//!
//! let config = SimulationConfig::default()
//!     .with_samples(2)
//!     .with_total_time_units(1500)
//!     .with_arrival_probability(0.02)
//!     .with_seed(7);
//! let report = MonteCarlo::new(config).unwrap().run().unwrap();
//! assert_eq!(report.results().len(), 9);
//! ```

mod clusters;

pub use clusters::ClusterAnalysis;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SimulationConfig;
use crate::dispatching::{DispatchPolicy, ServiceLine};
use crate::error::Result;
use crate::models::ArrivalLog;
use crate::simulation::{PerformanceVector, ServiceHierarchy};

/// A service structure to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scenario {
    /// Chief plus `config.collaborators` collaborator lines.
    Hierarchy {
        chief: DispatchPolicy,
        collaborators: DispatchPolicy,
    },
    /// A single line.
    SingleLine(DispatchPolicy),
}

impl Scenario {
    /// The nine reference scenarios: four chief/collaborator combinations
    /// of Sequential and Concurrent, then every policy on a single line.
    pub fn standard() -> Vec<Scenario> {
        use DispatchPolicy::{Concurrent, Sequential};

        let mut scenarios = vec![
            Scenario::Hierarchy { chief: Sequential, collaborators: Sequential },
            Scenario::Hierarchy { chief: Concurrent, collaborators: Sequential },
            Scenario::Hierarchy { chief: Sequential, collaborators: Concurrent },
            Scenario::Hierarchy { chief: Concurrent, collaborators: Concurrent },
        ];
        scenarios.extend(DispatchPolicy::ALL.into_iter().map(Scenario::SingleLine));
        scenarios
    }

    pub fn description(&self) -> String {
        match self {
            Scenario::Hierarchy {
                chief,
                collaborators,
            } => format!(
                "Hierarchical (Chief {} - Collaborators {})",
                chief.description(),
                collaborators.description()
            ),
            Scenario::SingleLine(policy) => format!("Single line ({})", policy.description()),
        }
    }

    /// Runs the scenario once. Returns the vector and the arrival log of
    /// the observable line.
    fn run<R: Rng>(
        &self,
        config: &SimulationConfig,
        rng: &mut R,
        replay: Option<&ArrivalLog>,
    ) -> Result<(PerformanceVector, ArrivalLog)> {
        match *self {
            Scenario::Hierarchy {
                chief,
                collaborators,
            } => {
                let mut hierarchy =
                    ServiceHierarchy::new(chief, config.collaborators, collaborators)?;
                let vector = hierarchy.run(config, rng, replay)?;
                Ok((vector, hierarchy.arrivals().clone()))
            }
            Scenario::SingleLine(policy) => {
                let mut line = ServiceLine::new(policy);
                let flattened = replay.map(|log| log.flattened(config.collaborators));
                let vector = line.run(config, rng, flattened.as_ref())?;
                Ok((vector, line.arrivals().clone()))
            }
        }
    }
}

/// Averaged outcome of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    /// Mean performance vector over all samples.
    pub average: PerformanceVector,
    /// Score of the mean vector (higher is better).
    pub score: f64,
}

/// Outcome of a Monte Carlo sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingReport {
    pub config: SimulationConfig,
    results: Vec<ScenarioResult>,
}

impl SamplingReport {
    /// Results in scenario order.
    pub fn results(&self) -> &[ScenarioResult] {
        &self.results
    }

    /// Results ordered by ascending score (worst first).
    pub fn ranked(&self) -> Vec<&ScenarioResult> {
        let mut ranked: Vec<&ScenarioResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
        ranked
    }

    /// Highest-scoring scenario.
    pub fn best(&self) -> Option<&ScenarioResult> {
        self.ranked().last().copied()
    }
}

/// Monte Carlo driver over a set of scenarios.
#[derive(Debug, Clone)]
pub struct MonteCarlo {
    config: SimulationConfig,
    scenarios: Vec<Scenario>,
}

impl MonteCarlo {
    /// Creates a driver over the [standard](Scenario::standard) scenarios.
    ///
    /// # Errors
    /// [`SimError::Configuration`](crate::SimError) if `config` is invalid.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scenarios: Scenario::standard(),
        })
    }

    /// Replaces the scenario set. The first scenario provides the arrival
    /// pattern the others replay.
    pub fn with_scenarios(mut self, scenarios: Vec<Scenario>) -> Self {
        self.scenarios = scenarios;
        self
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Runs `config.samples` samples of every scenario.
    ///
    /// Sample `i` is seeded with `seed + i`; without a configured seed the
    /// base seed is drawn from the OS.
    ///
    /// # Errors
    /// The first error of any run aborts the sampling.
    pub fn run(&self) -> Result<SamplingReport> {
        let base_seed = self.config.seed.unwrap_or_else(rand::random);
        let samples = self.config.samples;
        info!(samples, scenarios = self.scenarios.len(), base_seed, "sampling started");

        let mut totals = vec![PerformanceVector::default(); self.scenarios.len()];
        for sample in 0..samples {
            if sample % 100 == 0 {
                info!(sample, samples, "sampling progress");
            }
            let mut rng = SmallRng::seed_from_u64(base_seed.wrapping_add(sample as u64));
            let vectors = self.run_sample(&mut rng)?;
            for (total, vector) in totals.iter_mut().zip(vectors) {
                *total += vector;
            }
        }

        let results = self
            .scenarios
            .iter()
            .zip(totals)
            .map(|(&scenario, total)| {
                let average = total / samples as f64;
                ScenarioResult {
                    scenario,
                    average,
                    score: average.score(&self.config),
                }
            })
            .collect();
        info!(samples, "sampling finished");

        Ok(SamplingReport {
            config: self.config.clone(),
            results,
        })
    }

    /// Runs every scenario once, all on the first scenario's arrivals.
    ///
    /// Single lines replay that log too instead of sampling their own, so
    /// every scenario of a sample faces the same arrival pattern.
    pub fn run_sample<R: Rng>(&self, rng: &mut R) -> Result<Vec<PerformanceVector>> {
        let mut vectors = Vec::with_capacity(self.scenarios.len());
        let mut reference: Option<ArrivalLog> = None;

        for scenario in &self.scenarios {
            let (vector, log) = scenario.run(&self.config, rng, reference.as_ref())?;
            debug!(scenario = %scenario.description(), ?vector, "scenario sampled");
            vectors.push(vector);
            if reference.is_none() {
                reference = Some(log);
            }
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig::default()
            .with_samples(3)
            .with_total_time_units(2000)
            .with_arrival_probability(0.02)
            .with_seed(42)
    }

    #[test]
    fn test_standard_scenarios() {
        let scenarios = Scenario::standard();
        assert_eq!(scenarios.len(), 9);
        assert_eq!(
            scenarios[1].description(),
            "Hierarchical (Chief concurrent - Collaborators sequential)"
        );
        assert_eq!(scenarios[6].description(), "Single line (look for max)");
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(MonteCarlo::new(config().with_samples(0)).is_err());
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let a = MonteCarlo::new(config()).unwrap().run().unwrap();
        let b = MonteCarlo::new(config()).unwrap().run().unwrap();
        assert_eq!(a.results(), b.results());
    }

    #[test]
    fn test_report_ranking() {
        let report = MonteCarlo::new(config()).unwrap().run().unwrap();
        let ranked = report.ranked();
        assert_eq!(ranked.len(), 9);
        assert!(ranked.windows(2).all(|w| w[0].score <= w[1].score));
        assert_eq!(report.best().unwrap().score, ranked[8].score);
        for result in report.results() {
            assert!(result.average.average_extra_duration >= 0.0);
        }
    }

    #[test]
    fn test_single_line_replays_flattened_reference() {
        let config = config();
        let mut rng = SmallRng::seed_from_u64(9);
        let hierarchy = Scenario::Hierarchy {
            chief: DispatchPolicy::Sequential,
            collaborators: DispatchPolicy::Sequential,
        };

        let (_, reference) = hierarchy.run(&config, &mut rng, None).unwrap();
        let (_, single) = Scenario::SingleLine(DispatchPolicy::LookForMax)
            .run(&config, &mut rng, Some(&reference))
            .unwrap();
        assert_eq!(single, reference.flattened(config.collaborators));
    }

    #[test]
    fn test_custom_scenarios() {
        let driver = MonteCarlo::new(config().with_samples(1))
            .unwrap()
            .with_scenarios(vec![
                Scenario::SingleLine(DispatchPolicy::Sequential),
                Scenario::SingleLine(DispatchPolicy::RandomChoice),
            ]);
        let report = driver.run().unwrap();
        assert_eq!(report.results().len(), 2);
        assert_eq!(
            report.results()[1].scenario,
            Scenario::SingleLine(DispatchPolicy::RandomChoice)
        );
    }
}
