//! One-level service hierarchy: a chief line and N collaborator lines.
//!
//! # Delegation
//!
//! A delegated arrival of workload `w` is split into N + 1 equal shares of
//! `w / (N + 1) + 1` ticks (the `+ 1` keeps a share positive when `w < N`).
//! Every collaborator receives one share as a sub-request, and the chief
//! receives a waiting request with the same share that depends on exactly
//! those N sub-requests.
//!
//! Only the chief is observable from outside: the performance vector is
//! computed from its queue alone.

use rand::Rng;
use tracing::debug;

use crate::config::SimulationConfig;
use crate::dispatching::{DispatchPolicy, NoDependencies, ServiceLine};
use crate::error::{Result, SimError};
use crate::models::{ArrivalLog, LineId, RequestKey, TimeUnit};
use crate::simulation::{ArrivalGenerator, PerformanceVector};

/// Chief line plus a fixed set of collaborator lines.
///
/// # Example
/// ```
/// use u_service_line::dispatching::DispatchPolicy;
/// use u_service_line::simulation::ServiceHierarchy;
///
/// let mut hierarchy =
///     ServiceHierarchy::new(DispatchPolicy::Sequential, 3, DispatchPolicy::Concurrent).unwrap();
/// let share = ServiceHierarchy::share_of(10, 3);
/// hierarchy.delegate(0, share, false).unwrap();
///
/// let chief_request = &hierarchy.chief().requests()[0];
/// assert_eq!(chief_request.workload(), 3);
/// assert_eq!(chief_request.dependencies().len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceHierarchy {
    id: u32,
    chief: ServiceLine,
    collaborators: Vec<ServiceLine>,
}

impl ServiceHierarchy {
    /// Creates a hierarchy. The chief is line 0, collaborators are lines
    /// `1..=collaborators`.
    ///
    /// # Errors
    /// [`SimError::Configuration`] if `collaborators` is zero.
    pub fn new(
        chief_policy: DispatchPolicy,
        collaborators: usize,
        collaborator_policy: DispatchPolicy,
    ) -> Result<Self> {
        if collaborators == 0 {
            return Err(SimError::configuration(
                "a hierarchy needs at least one collaborator",
            ));
        }
        let count = u32::try_from(collaborators).map_err(|_| {
            SimError::configuration(format!("{collaborators} collaborators exceed the line id range"))
        })?;
        let collaborators = (1..=count)
            .map(|i| ServiceLine::with_id(LineId(i), collaborator_policy))
            .collect();
        Ok(Self {
            id: 0,
            chief: ServiceLine::with_id(LineId(0), chief_policy),
            collaborators,
        })
    }

    /// Sets the hierarchy identifier.
    pub fn with_id(mut self, id: u32) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn chief(&self) -> &ServiceLine {
        &self.chief
    }

    pub fn collaborators(&self) -> &[ServiceLine] {
        &self.collaborators
    }

    /// The chief's arrival log: one record per chief-level request.
    pub fn arrivals(&self) -> &ArrivalLog {
        self.chief.arrivals()
    }

    /// Workload of each share when `workload` is split across
    /// `collaborators` plus the chief.
    pub fn share_of(workload: u32, collaborators: usize) -> u32 {
        let parts = u32::try_from(collaborators)
            .unwrap_or(u32::MAX)
            .saturating_add(1);
        workload / parts + 1
    }

    /// Admits a delegated request whose shares are already computed: one
    /// sub-request of `share` per collaborator, then a chief request of
    /// `share` waiting on all of them. Returns the chief request's key.
    ///
    /// # Errors
    /// [`SimError::Configuration`] if `share` is zero; no line is touched.
    pub fn delegate(&mut self, now: TimeUnit, share: u32, priority: bool) -> Result<RequestKey> {
        if share == 0 {
            return Err(SimError::configuration(format!(
                "delegated request at {now} with a zero share"
            )));
        }
        let dependencies = self
            .collaborators
            .iter_mut()
            .map(|collaborator| {
                let id = collaborator.admit(now, share, priority, Vec::new())?.id();
                Ok(collaborator.key(id))
            })
            .collect::<Result<Vec<RequestKey>>>()?;
        let id = self.chief.admit(now, share, priority, dependencies)?.id();
        Ok(self.chief.key(id))
    }

    /// Admits a request straight into the chief line.
    ///
    /// # Errors
    /// [`SimError::Configuration`] if `workload` is zero.
    pub fn admit_direct(
        &mut self,
        now: TimeUnit,
        workload: u32,
        priority: bool,
    ) -> Result<RequestKey> {
        let id = self.chief.admit(now, workload, priority, Vec::new())?.id();
        Ok(self.chief.key(id))
    }

    /// Services one tick: the chief first, then every collaborator
    /// independently.
    ///
    /// # Errors
    /// Propagates [`SimError::InvariantViolation`] from any line.
    pub fn dispatch<R: Rng>(&mut self, now: TimeUnit, rng: &mut R) -> Result<()> {
        self.chief
            .dispatch(now, rng, self.collaborators.as_slice())?;
        for collaborator in &mut self.collaborators {
            collaborator.dispatch(now, rng, &NoDependencies)?;
        }
        Ok(())
    }

    /// Runs the full timeline and returns the chief's performance vector.
    ///
    /// Sampled delegated arrivals are split with [`share_of`](Self::share_of).
    /// Replayed delegated arrivals already carry the recorded share.
    ///
    /// # Errors
    /// - [`SimError::Configuration`] if `config` is invalid.
    /// - [`SimError::NoCompletedRequests`] if the chief completed nothing.
    pub fn run<R: Rng>(
        &mut self,
        config: &SimulationConfig,
        rng: &mut R,
        replay: Option<&ArrivalLog>,
    ) -> Result<PerformanceVector> {
        let mut generator = match replay {
            Some(log) => ArrivalGenerator::replay(log),
            None => ArrivalGenerator::sampled(config)?
                .with_delegation(config.subrequest_probability),
        };
        let collaborators = self.collaborators.len();

        for now in 0..config.total_time_units {
            match generator.next_arrival(now, rng) {
                Some(arrival) if arrival.delegated => {
                    let share = if generator.is_replay() {
                        arrival.workload
                    } else {
                        Self::share_of(arrival.workload, collaborators)
                    };
                    self.delegate(now, share, arrival.priority)?;
                }
                Some(arrival) => {
                    self.admit_direct(now, arrival.workload, arrival.priority)?;
                }
                None => self.dispatch(now, rng)?,
            }
        }

        let vector = PerformanceVector::from_line(&self.chief, config.total_time_units)?;
        debug!(
            hierarchy = self.id,
            chief = %self.chief.policy(),
            collaborators = %self.collaborators[0].policy(),
            ?vector,
            "hierarchy run finished"
        );
        Ok(vector)
    }
}
