//! Service line: a request queue plus one dispatch policy.
//!
//! # Tick algorithm
//!
//! 1. If the queue is non-empty, sample the live counters (active count,
//!    occupancy) and try priority-flagged requests in insertion order. The
//!    first one that does work ends the tick, whatever the policy.
//! 2. Otherwise apply the configured [`DispatchPolicy`]. A tick the policy
//!    cannot use counts as an empty tick.
//!
//! Completed requests stay in the queue for statistics but are never
//! candidates for LookForMax, LookForMin or RandomChoice.

use rand::Rng;
use rand::prelude::IndexedRandom;
use tracing::debug;

use super::{DependencyResolver, DispatchPolicy, NoDependencies};
use crate::config::SimulationConfig;
use crate::error::{Result, SimError};
use crate::models::{
    ArrivalLog, ArrivalRecord, LineId, Request, RequestId, RequestKey, RequestState, TimeUnit,
};
use crate::simulation::{ArrivalGenerator, PerformanceVector};

/// Live counters accumulated while a line runs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LineStats {
    /// Ticks on which dispatch found nothing to do.
    pub empty_ticks: u64,
    /// Sum over ticks of the number of active requests.
    pub cumulative_active: u64,
    /// Most active requests ever queued at once.
    pub peak_active: usize,
    /// Latest `active / queue length` ratio (0.0..=1.0).
    pub occupancy: f64,
}

/// A queue of requests served under one dispatch policy.
///
/// # Example
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::SmallRng;
/// use u_service_line::dispatching::{DispatchPolicy, NoDependencies, ServiceLine};
///
/// let mut line = ServiceLine::new(DispatchPolicy::Sequential);
/// let mut rng = SmallRng::seed_from_u64(1);
/// line.admit(0, 2, false, Vec::new()).unwrap();
/// assert!(line.dispatch(1, &mut rng, &NoDependencies).unwrap());
/// assert!(line.dispatch(2, &mut rng, &NoDependencies).unwrap());
/// assert!(!line.dispatch(3, &mut rng, &NoDependencies).unwrap());
/// assert_eq!(line.stats().empty_ticks, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ServiceLine {
    id: LineId,
    policy: DispatchPolicy,
    queue: Vec<Request>,
    arrivals: ArrivalLog,
    next_request: u64,
    stats: LineStats,
    cursor: RequestId,
}

impl ServiceLine {
    /// Creates a standalone line (id 0).
    pub fn new(policy: DispatchPolicy) -> Self {
        Self::with_id(LineId(0), policy)
    }

    /// Creates a line with an explicit id, as used inside a hierarchy.
    pub fn with_id(id: LineId, policy: DispatchPolicy) -> Self {
        Self {
            id,
            policy,
            queue: Vec::new(),
            arrivals: ArrivalLog::new(),
            next_request: 1,
            stats: LineStats::default(),
            cursor: RequestId(0),
        }
    }

    pub fn id(&self) -> LineId {
        self.id
    }

    pub fn policy(&self) -> DispatchPolicy {
        self.policy
    }

    /// Queued requests in insertion order, completed ones included.
    pub fn requests(&self) -> &[Request] {
        &self.queue
    }

    /// Log of every admission on this line.
    pub fn arrivals(&self) -> &ArrivalLog {
        &self.arrivals
    }

    pub fn stats(&self) -> &LineStats {
        &self.stats
    }

    /// Concurrent rotation cursor. `RequestId(0)` means "from the start".
    pub fn cursor(&self) -> RequestId {
        self.cursor
    }

    /// Looks up a request by id.
    pub fn request(&self, id: RequestId) -> Option<&Request> {
        // Ids are issued in insertion order.
        self.queue
            .binary_search_by_key(&id, |r| r.id())
            .ok()
            .map(|idx| &self.queue[idx])
    }

    /// Globally addressable key for one of this line's requests.
    pub fn key(&self, id: RequestId) -> RequestKey {
        RequestKey::new(self.id, id)
    }

    /// Number of requests currently `Active`.
    pub fn active_count(&self) -> usize {
        self.queue.iter().filter(|r| r.is_active()).count()
    }

    /// Number of requests not yet `Completed`.
    pub fn pending_count(&self) -> usize {
        self.queue.iter().filter(|r| r.is_pending()).count()
    }

    /// Admits a new request at `now`.
    ///
    /// The request waits on `dependencies` when non-empty. The admission is
    /// appended to the arrival log and the peak active count is refreshed.
    ///
    /// # Errors
    /// [`SimError::Configuration`] if `workload` is zero; nothing is queued.
    pub fn admit(
        &mut self,
        now: TimeUnit,
        workload: u32,
        priority: bool,
        dependencies: Vec<RequestKey>,
    ) -> Result<&Request> {
        if workload == 0 {
            return Err(SimError::configuration(format!(
                "request admitted on line {} at {now} with zero workload",
                self.id
            )));
        }
        let id = RequestId(self.next_request);
        self.next_request += 1;

        let delegated = !dependencies.is_empty();
        self.queue
            .push(Request::new(id, now, workload, priority, dependencies));
        self.arrivals
            .push(ArrivalRecord::new(now, workload, priority).with_delegation(delegated));

        let active = self.active_count();
        if active > self.stats.peak_active {
            self.stats.peak_active = active;
        }

        debug!(line = %self.id, request = %id, now, workload, priority, delegated, "request admitted");
        Ok(&self.queue[self.queue.len() - 1])
    }

    /// Services the queue for one tick at `now`.
    ///
    /// Returns whether the tick was used. `deps` resolves the state of
    /// requests on other lines that waiting requests depend on.
    ///
    /// # Errors
    /// Propagates [`SimError::InvariantViolation`](crate::SimError) from
    /// advancing a request.
    pub fn dispatch<R, D>(&mut self, now: TimeUnit, rng: &mut R, deps: &D) -> Result<bool>
    where
        R: Rng,
        D: DependencyResolver + ?Sized,
    {
        if !self.queue.is_empty() {
            let active = self.active_count();
            self.stats.cumulative_active += active as u64;
            self.stats.occupancy = active as f64 / self.queue.len() as f64;

            // Priority pre-emption, independent of the policy.
            for request in self.queue.iter_mut().filter(|r| r.priority()) {
                if request.advance(now, self.id, deps)? {
                    return Ok(true);
                }
            }
        }

        let handled = match self.policy {
            DispatchPolicy::Sequential => self.dispatch_sequential(now, deps)?,
            DispatchPolicy::Concurrent => self.dispatch_concurrent(now, deps)?,
            DispatchPolicy::LookForMax => self.dispatch_look_for_max(now, deps)?,
            DispatchPolicy::LookForMin => self.dispatch_look_for_min(now, deps)?,
            DispatchPolicy::RandomChoice => self.dispatch_random(now, rng, deps)?,
        };

        if !handled {
            self.stats.empty_ticks += 1;
        }
        Ok(handled)
    }

    /// Runs the full timeline and returns the line's performance vector.
    ///
    /// Arrivals are sampled from `config` unless `replay` is given, in which
    /// case the logged arrivals are admitted at their recorded time units.
    /// A tick with an admission does no dispatching.
    ///
    /// # Errors
    /// - [`SimError::Configuration`](crate::SimError) if `config` is invalid.
    /// - [`SimError::NoCompletedRequests`](crate::SimError) if nothing
    ///   completed by the end of the timeline.
    pub fn run<R: Rng>(
        &mut self,
        config: &SimulationConfig,
        rng: &mut R,
        replay: Option<&ArrivalLog>,
    ) -> Result<PerformanceVector> {
        let mut generator = match replay {
            Some(log) => ArrivalGenerator::replay(log),
            None => ArrivalGenerator::sampled(config)?,
        };

        for now in 0..config.total_time_units {
            match generator.next_arrival(now, rng) {
                Some(arrival) => {
                    self.admit(now, arrival.workload, arrival.priority, Vec::new())?;
                }
                None => {
                    self.dispatch(now, rng, &NoDependencies)?;
                }
            }
        }

        let vector = PerformanceVector::from_line(self, config.total_time_units)?;
        debug!(line = %self.id, policy = %self.policy, ?vector, "run finished");
        Ok(vector)
    }

    fn dispatch_sequential<D>(&mut self, now: TimeUnit, deps: &D) -> Result<bool>
    where
        D: DependencyResolver + ?Sized,
    {
        for request in &mut self.queue {
            if request.advance(now, self.id, deps)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every request up to the serviced one is advanced; only a request
    /// past the cursor counts as the tick's work.
    fn dispatch_concurrent<D>(&mut self, now: TimeUnit, deps: &D) -> Result<bool>
    where
        D: DependencyResolver + ?Sized,
    {
        let mut serviced = None;
        for request in &mut self.queue {
            let worked = request.advance(now, self.id, deps)?;
            if worked && request.id() > self.cursor {
                serviced = Some(request.id());
                break;
            }
        }

        let Some(id) = serviced else {
            return Ok(false);
        };

        self.cursor = id;
        let more_ahead = self
            .queue
            .iter()
            .any(|r| r.is_pending() && r.id() > self.cursor);
        if !more_ahead {
            self.cursor = RequestId(0);
        }
        Ok(true)
    }

    fn dispatch_look_for_max<D>(&mut self, now: TimeUnit, deps: &D) -> Result<bool>
    where
        D: DependencyResolver + ?Sized,
    {
        let mut best: Option<usize> = None;
        let mut best_remaining: i64 = -1;
        for (idx, request) in self.candidates() {
            if i64::from(request.remaining()) > best_remaining {
                best_remaining = i64::from(request.remaining());
                best = Some(idx);
            }
        }
        self.advance_selected(best, now, deps)
    }

    fn dispatch_look_for_min<D>(&mut self, now: TimeUnit, deps: &D) -> Result<bool>
    where
        D: DependencyResolver + ?Sized,
    {
        let mut best: Option<usize> = None;
        let mut best_remaining = u64::MAX;
        for (idx, request) in self.candidates() {
            if u64::from(request.remaining()) < best_remaining {
                best_remaining = u64::from(request.remaining());
                best = Some(idx);
            }
        }
        self.advance_selected(best, now, deps)
    }

    fn dispatch_random<R, D>(&mut self, now: TimeUnit, rng: &mut R, deps: &D) -> Result<bool>
    where
        R: Rng,
        D: DependencyResolver + ?Sized,
    {
        let indices: Vec<usize> = self.candidates().map(|(idx, _)| idx).collect();
        let chosen = indices.choose(rng).copied();
        self.advance_selected(chosen, now, deps)
    }

    /// Non-completed requests with their queue index.
    fn candidates(&self) -> impl Iterator<Item = (usize, &Request)> {
        self.queue.iter().enumerate().filter(|(_, r)| r.is_pending())
    }

    /// Advances the selected request. The tick counts as handled even when
    /// the request itself could not work (a blocked waiting request).
    fn advance_selected<D>(&mut self, selected: Option<usize>, now: TimeUnit, deps: &D) -> Result<bool>
    where
        D: DependencyResolver + ?Sized,
    {
        match selected {
            Some(idx) => {
                self.queue[idx].advance(now, self.id, deps)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl DependencyResolver for ServiceLine {
    fn state_of(&self, key: RequestKey) -> Option<RequestState> {
        if key.line != self.id {
            return None;
        }
        self.request(key.request).map(|r| r.state())
    }
}

impl DependencyResolver for [ServiceLine] {
    fn state_of(&self, key: RequestKey) -> Option<RequestState> {
        self.iter()
            .find(|line| line.id() == key.line)
            .and_then(|line| line.state_of(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn rng() -> SmallRng {
        SmallRng::seed_from_u64(42)
    }

    fn line_with(policy: DispatchPolicy, workloads: &[u32]) -> ServiceLine {
        let mut line = ServiceLine::new(policy);
        for &w in workloads {
            line.admit(0, w, false, Vec::new()).unwrap();
        }
        line
    }

    fn remaining(line: &ServiceLine) -> Vec<u32> {
        line.requests().iter().map(|r| r.remaining()).collect()
    }

    #[test]
    fn test_admit_assigns_ids_and_logs() {
        let mut line = ServiceLine::new(DispatchPolicy::Sequential);
        let first = line.admit(3, 5, true, Vec::new()).unwrap().id();
        let second = line.admit(4, 2, false, Vec::new()).unwrap().id();

        assert_eq!(first, RequestId(1));
        assert_eq!(second, RequestId(2));
        assert_eq!(
            line.arrivals().records(),
            &[ArrivalRecord::new(3, 5, true), ArrivalRecord::new(4, 2, false)]
        );
        assert_eq!(line.stats().peak_active, 2);
        assert_eq!(line.request(RequestId(2)).unwrap().workload(), 2);
        assert!(line.request(RequestId(3)).is_none());
    }

    #[test]
    fn test_zero_workload_rejected() {
        let mut line = ServiceLine::new(DispatchPolicy::Sequential);
        let err = line.admit(0, 0, false, Vec::new()).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
        assert!(line.requests().is_empty());
        assert!(line.arrivals().is_empty());
        assert_eq!(line.admit(1, 2, false, Vec::new()).unwrap().id(), RequestId(1));
    }

    #[test]
    fn test_replayed_zero_workload_fails_run() {
        let log: ArrivalLog = vec![ArrivalRecord::new(0, 0, false)].into_iter().collect();
        let config = SimulationConfig::default().with_total_time_units(10);
        let mut line = ServiceLine::new(DispatchPolicy::Sequential);

        let err = line.run(&config, &mut rng(), Some(&log)).unwrap_err();
        assert!(matches!(err, SimError::Configuration(_)));
    }

    #[test]
    fn test_sampled_run_ignores_driver_settings() {
        let config = SimulationConfig::default()
            .with_total_time_units(2000)
            .with_arrival_probability(0.02)
            .with_samples(0)
            .with_collaborators(0);
        let mut line = ServiceLine::new(DispatchPolicy::Concurrent);

        assert!(line.run(&config, &mut rng(), None).is_ok());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_queue_counts_empty_tick_for_every_policy() {
        for policy in DispatchPolicy::ALL {
            let mut line = ServiceLine::new(policy);
            let mut rng = rng();
            assert!(!line.dispatch(0, &mut rng, &NoDependencies).unwrap());
            assert!(!line.dispatch(1, &mut rng, &NoDependencies).unwrap());
            assert_eq!(line.stats().empty_ticks, 2, "{policy}");
            assert_eq!(line.stats().cumulative_active, 0);
        }
    }

    #[test]
    fn test_sequential_serves_in_insertion_order() {
        let mut line = line_with(DispatchPolicy::Sequential, &[2, 3]);
        let mut rng = rng();

        line.dispatch(1, &mut rng, &NoDependencies).unwrap();
        assert_eq!(remaining(&line), vec![1, 3]);
        line.dispatch(2, &mut rng, &NoDependencies).unwrap();
        assert_eq!(remaining(&line), vec![0, 3]);
        assert_eq!(line.requests()[0].completion(), Some(2));
        line.dispatch(3, &mut rng, &NoDependencies).unwrap();
        assert_eq!(remaining(&line), vec![0, 2]);
    }

    #[test]
    fn test_priority_preempts_every_policy() {
        for policy in DispatchPolicy::ALL {
            let mut line = ServiceLine::new(policy);
            line.admit(0, 9, false, Vec::new()).unwrap();
            line.admit(0, 4, true, Vec::new()).unwrap();
            line.admit(0, 1, false, Vec::new()).unwrap();
            let mut rng = rng();

            assert!(line.dispatch(1, &mut rng, &NoDependencies).unwrap());
            assert_eq!(remaining(&line), vec![9, 3, 1], "{policy}");
        }
    }

    #[test]
    fn test_priority_falls_through_once_completed() {
        let mut line = ServiceLine::new(DispatchPolicy::Sequential);
        line.admit(0, 2, false, Vec::new()).unwrap();
        line.admit(0, 1, true, Vec::new()).unwrap();
        let mut rng = rng();

        line.dispatch(1, &mut rng, &NoDependencies).unwrap();
        assert_eq!(remaining(&line), vec![2, 0]);
        line.dispatch(2, &mut rng, &NoDependencies).unwrap();
        assert_eq!(remaining(&line), vec![1, 0]);
    }

    #[test]
    fn test_live_counters() {
        let mut line = line_with(DispatchPolicy::Sequential, &[1, 3]);
        let mut rng = rng();

        line.dispatch(1, &mut rng, &NoDependencies).unwrap();
        assert_eq!(line.stats().cumulative_active, 2);
        assert!((line.stats().occupancy - 1.0).abs() < 1e-10);

        line.dispatch(2, &mut rng, &NoDependencies).unwrap();
        assert_eq!(line.stats().cumulative_active, 3);
        assert!((line.stats().occupancy - 0.5).abs() < 1e-10);
        assert_eq!(line.stats().peak_active, 2);
    }

    #[test]
    fn test_look_for_max_and_min() {
        let mut max = line_with(DispatchPolicy::LookForMax, &[3, 7, 1]);
        let mut min = line_with(DispatchPolicy::LookForMin, &[3, 7, 1]);
        let mut rng = rng();

        assert!(max.dispatch(1, &mut rng, &NoDependencies).unwrap());
        assert_eq!(remaining(&max), vec![3, 6, 1]);

        assert!(min.dispatch(1, &mut rng, &NoDependencies).unwrap());
        assert_eq!(remaining(&min), vec![3, 7, 0]);
        // Completed requests are no longer candidates.
        assert!(min.dispatch(2, &mut rng, &NoDependencies).unwrap());
        assert_eq!(remaining(&min), vec![2, 7, 0]);
    }

    #[test]
    fn test_look_for_extremes_independent_of_order() {
        for (policy, expected) in [(DispatchPolicy::LookForMax, 7), (DispatchPolicy::LookForMin, 1)] {
            for order in [[7, 3, 1], [1, 3, 7], [3, 1, 7]] {
                let mut line = line_with(policy, &order);
                line.dispatch(1, &mut rng(), &NoDependencies).unwrap();
                let served: Vec<u32> = line
                    .requests()
                    .iter()
                    .filter(|r| r.remaining() != r.workload())
                    .map(|r| r.workload())
                    .collect();
                assert_eq!(served, vec![expected], "{policy} {order:?}");
            }
        }
    }

    #[test]
    fn test_look_for_ties_break_by_insertion_order() {
        let mut max = line_with(DispatchPolicy::LookForMax, &[5, 5]);
        let mut min = line_with(DispatchPolicy::LookForMin, &[2, 2]);
        let mut rng = rng();

        max.dispatch(1, &mut rng, &NoDependencies).unwrap();
        min.dispatch(1, &mut rng, &NoDependencies).unwrap();
        assert_eq!(remaining(&max), vec![4, 5]);
        assert_eq!(remaining(&min), vec![1, 2]);
    }

    #[test]
    fn test_look_for_max_wastes_tick_on_blocked_request() {
        let mut collaborator = ServiceLine::with_id(LineId(1), DispatchPolicy::Sequential);
        let sub = collaborator.admit(0, 1, false, Vec::new()).unwrap().id();
        let key = collaborator.key(sub);

        let mut chief = ServiceLine::with_id(LineId(0), DispatchPolicy::LookForMax);
        chief.admit(0, 2, false, Vec::new()).unwrap();
        chief.admit(0, 9, false, vec![key]).unwrap();
        let mut rng = rng();

        // The blocked request has the largest workload: tick handled, no work.
        assert!(chief.dispatch(1, &mut rng, &collaborator).unwrap());
        assert_eq!(remaining(&chief), vec![2, 9]);
        assert_eq!(chief.stats().empty_ticks, 0);
    }

    #[test]
    fn test_random_choice_only_picks_pending() {
        let mut line = line_with(DispatchPolicy::RandomChoice, &[1, 1, 1]);
        let mut rng = rng();

        for now in 1..=3 {
            assert!(line.dispatch(now, &mut rng, &NoDependencies).unwrap());
        }
        assert!(line.requests().iter().all(|r| r.is_completed()));
        assert!(!line.dispatch(4, &mut rng, &NoDependencies).unwrap());
        assert_eq!(line.stats().empty_ticks, 1);
    }

    #[test]
    fn test_concurrent_rotation() {
        let mut line = line_with(DispatchPolicy::Concurrent, &[5, 5, 5]);
        let mut rng = rng();

        assert!(line.dispatch(1, &mut rng, &NoDependencies).unwrap());
        assert_eq!(line.cursor(), RequestId(1));
        assert_eq!(remaining(&line), vec![4, 5, 5]);

        // Request 1 is advanced on the way past the cursor.
        assert!(line.dispatch(2, &mut rng, &NoDependencies).unwrap());
        assert_eq!(line.cursor(), RequestId(2));
        assert_eq!(remaining(&line), vec![3, 4, 5]);

        // Request 3 is the last schedulable id: cursor wraps on the same call.
        assert!(line.dispatch(3, &mut rng, &NoDependencies).unwrap());
        assert_eq!(line.cursor(), RequestId(0));
        assert_eq!(remaining(&line), vec![2, 3, 4]);

        assert!(line.dispatch(4, &mut rng, &NoDependencies).unwrap());
        assert_eq!(line.cursor(), RequestId(1));
        assert_eq!(remaining(&line), vec![1, 3, 4]);
    }

    #[test]
    fn test_concurrent_wraps_when_nothing_ahead_is_pending() {
        let mut line = line_with(DispatchPolicy::Concurrent, &[3, 1]);
        let mut rng = rng();

        line.dispatch(1, &mut rng, &NoDependencies).unwrap();
        assert_eq!(line.cursor(), RequestId(1));
        line.dispatch(2, &mut rng, &NoDependencies).unwrap();
        // Request 2 completed, nothing schedulable past it.
        assert_eq!(line.cursor(), RequestId(0));
        assert_eq!(remaining(&line), vec![1, 0]);
    }

    #[test]
    fn test_concurrent_idle_when_all_completed() {
        let mut line = line_with(DispatchPolicy::Concurrent, &[1]);
        let mut rng = rng();

        assert!(line.dispatch(1, &mut rng, &NoDependencies).unwrap());
        assert_eq!(line.cursor(), RequestId(0));
        assert!(!line.dispatch(2, &mut rng, &NoDependencies).unwrap());
        assert_eq!(line.stats().empty_ticks, 1);
    }

    #[test]
    fn test_waiting_request_resolves_through_slice() {
        let mut collaborators = vec![
            ServiceLine::with_id(LineId(1), DispatchPolicy::Sequential),
            ServiceLine::with_id(LineId(2), DispatchPolicy::Sequential),
        ];
        let keys: Vec<RequestKey> = collaborators
            .iter_mut()
            .map(|c| {
                let id = c.admit(0, 1, false, Vec::new()).unwrap().id();
                c.key(id)
            })
            .collect();
        let mut chief = ServiceLine::with_id(LineId(0), DispatchPolicy::Sequential);
        chief.admit(0, 1, false, keys).unwrap();
        let mut rng = rng();

        assert!(!chief.dispatch(1, &mut rng, collaborators.as_slice()).unwrap());
        for c in &mut collaborators {
            c.dispatch(1, &mut rng, &NoDependencies).unwrap();
        }
        assert!(chief.dispatch(2, &mut rng, collaborators.as_slice()).unwrap());
        assert!(chief.requests()[0].is_active());
        assert!(chief.dispatch(3, &mut rng, collaborators.as_slice()).unwrap());
        assert_eq!(chief.requests()[0].completion(), Some(3));
    }

    #[test]
    fn test_dangling_dependency_fails_dispatch() {
        let mut chief = ServiceLine::with_id(LineId(0), DispatchPolicy::Sequential);
        chief.admit(0, 1, false, vec![RequestKey::new(LineId(5), RequestId(1))]).unwrap();

        let err = chief
            .dispatch(1, &mut rng(), &NoDependencies)
            .unwrap_err();
        assert!(matches!(err, SimError::InvariantViolation { .. }));
    }
}
