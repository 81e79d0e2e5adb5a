//! Request model.
//!
//! A request is one unit of work queued on a service line. Its state machine
//! only moves forward:
//!
//! ```text
//! Waiting ──► Active ──► Completed
//!               ▲
//!   (created) ──┘
//! ```
//!
//! A request created with dependencies starts `Waiting` and becomes `Active`
//! once every dependency is `Completed`. Becoming schedulable costs no tick;
//! its own workload is serviced from the next advance on.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use crate::dispatching::DependencyResolver;
use crate::error::{Result, SimError};

/// Discrete simulation clock step.
pub type TimeUnit = u32;

/// Identifier of a service line (unique within its hierarchy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineId(pub u32);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a request, monotonic within its owning line.
///
/// `RequestId(0)` is never issued; the concurrent rotation uses it as the
/// "start from the beginning" cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Globally addressable request: owning line plus the id within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub line: LineId,
    pub request: RequestId,
}

impl RequestKey {
    pub fn new(line: LineId, request: RequestId) -> Self {
        Self { line, request }
    }
}

/// Lifecycle state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestState {
    /// Schedulable; each advance consumes one tick of workload.
    Active,
    /// Blocked on delegated sub-requests.
    Waiting,
    /// Done. Kept in the queue for statistics only.
    Completed,
}

/// A queued unit of work.
#[derive(Debug, Clone)]
pub struct Request {
    id: RequestId,
    arrival: TimeUnit,
    remaining: u32,
    workload: u32,
    completion: Option<TimeUnit>,
    priority: bool,
    state: RequestState,
    dependencies: Vec<RequestKey>,
}

impl Request {
    /// Creates a request arriving at `arrival` with `workload` ticks of work.
    ///
    /// Starts `Waiting` when `dependencies` is non-empty, `Active` otherwise.
    pub fn new(
        id: RequestId,
        arrival: TimeUnit,
        workload: u32,
        priority: bool,
        dependencies: Vec<RequestKey>,
    ) -> Self {
        let state = if dependencies.is_empty() {
            RequestState::Active
        } else {
            RequestState::Waiting
        };
        Self {
            id,
            arrival,
            remaining: workload,
            workload,
            completion: None,
            priority,
            state,
            dependencies,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Time unit at which the request was admitted.
    pub fn arrival(&self) -> TimeUnit {
        self.arrival
    }

    /// Ticks of work still to be serviced.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Minimum number of ticks the request needs (its original workload).
    pub fn workload(&self) -> u32 {
        self.workload
    }

    /// Set exactly when the request is `Completed`.
    pub fn completion(&self) -> Option<TimeUnit> {
        self.completion
    }

    pub fn priority(&self) -> bool {
        self.priority
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    pub fn dependencies(&self) -> &[RequestKey] {
        &self.dependencies
    }

    pub fn is_active(&self) -> bool {
        self.state == RequestState::Active
    }

    pub fn is_completed(&self) -> bool {
        self.state == RequestState::Completed
    }

    /// Active or Waiting.
    pub fn is_pending(&self) -> bool {
        !self.is_completed()
    }

    /// Ticks lost beyond the minimum workload:
    /// `completion - arrival - workload`. `None` until completed.
    pub fn extra_duration(&self) -> Option<i64> {
        self.completion
            .map(|done| i64::from(done) - i64::from(self.arrival) - i64::from(self.workload))
    }

    /// Advances the request by one tick at time `now`.
    ///
    /// Returns whether any work happened:
    /// - `Active`: consumes one tick, completing at zero. Always `true`.
    /// - `Waiting`: `false` while any dependency is unfinished; otherwise
    ///   becomes `Active` without consuming a tick and returns `true`.
    /// - `Completed`: no-op, `false`.
    ///
    /// # Errors
    /// [`SimError::InvariantViolation`] when an `Active` request has no
    /// workload left, a `Waiting` request has no dependencies, or a
    /// dependency cannot be resolved.
    pub fn advance<D>(&mut self, now: TimeUnit, owner: LineId, deps: &D) -> Result<bool>
    where
        D: DependencyResolver + ?Sized,
    {
        match self.state {
            RequestState::Active => {
                self.remaining = self
                    .remaining
                    .checked_sub(1)
                    .ok_or_else(|| self.violation(owner, "active with no remaining workload"))?;
                if self.remaining == 0 {
                    self.state = RequestState::Completed;
                    self.completion = Some(now);
                    trace!(line = %owner, request = %self.id, now, "request completed");
                }
                Ok(true)
            }
            RequestState::Waiting => {
                if self.dependencies.is_empty() {
                    return Err(self.violation(owner, "waiting with an empty dependency set"));
                }
                for key in &self.dependencies {
                    match deps.state_of(*key) {
                        Some(RequestState::Completed) => {}
                        Some(_) => return Ok(false),
                        None => {
                            return Err(self.violation(
                                owner,
                                format!(
                                    "dependency {} on line {} does not exist",
                                    key.request, key.line
                                ),
                            ))
                        }
                    }
                }
                self.state = RequestState::Active;
                trace!(line = %owner, request = %self.id, now, "dependencies satisfied");
                Ok(true)
            }
            RequestState::Completed => Ok(false),
        }
    }

    fn violation(&self, line: LineId, reason: impl Into<String>) -> SimError {
        SimError::InvariantViolation {
            line,
            request: self.id,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatching::NoDependencies;
    use std::collections::HashMap;

    const LINE: LineId = LineId(0);

    struct FixedStates(HashMap<RequestKey, RequestState>);

    impl DependencyResolver for FixedStates {
        fn state_of(&self, key: RequestKey) -> Option<RequestState> {
            self.0.get(&key).copied()
        }
    }

    fn key(line: u32, request: u64) -> RequestKey {
        RequestKey::new(LineId(line), RequestId(request))
    }

    #[test]
    fn test_initial_state() {
        let plain = Request::new(RequestId(1), 0, 3, false, Vec::new());
        assert_eq!(plain.state(), RequestState::Active);

        let chief = Request::new(RequestId(2), 0, 3, false, vec![key(1, 1)]);
        assert_eq!(chief.state(), RequestState::Waiting);
        assert_eq!(chief.completion(), None);
    }

    #[test]
    fn test_active_runs_to_completion() {
        let mut r = Request::new(RequestId(1), 5, 3, false, Vec::new());

        assert!(r.advance(6, LINE, &NoDependencies).unwrap());
        assert!(r.advance(7, LINE, &NoDependencies).unwrap());
        assert_eq!(r.remaining(), 1);
        assert!(r.is_active());

        assert!(r.advance(8, LINE, &NoDependencies).unwrap());
        assert_eq!(r.remaining(), 0);
        assert!(r.is_completed());
        assert_eq!(r.completion(), Some(8));
        assert_eq!(r.extra_duration(), Some(0));
    }

    #[test]
    fn test_completed_is_noop() {
        let mut r = Request::new(RequestId(1), 0, 1, false, Vec::new());
        assert!(r.advance(1, LINE, &NoDependencies).unwrap());
        assert!(!r.advance(2, LINE, &NoDependencies).unwrap());
        assert_eq!(r.completion(), Some(1));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn test_waiting_blocks_until_dependencies_complete() {
        let deps = vec![key(1, 1), key(2, 1)];
        let mut r = Request::new(RequestId(1), 0, 2, false, deps);

        let mut states = FixedStates(HashMap::from([
            (key(1, 1), RequestState::Completed),
            (key(2, 1), RequestState::Active),
        ]));
        assert!(!r.advance(1, LINE, &states).unwrap());
        assert_eq!(r.state(), RequestState::Waiting);
        assert_eq!(r.remaining(), 2);

        states.0.insert(key(2, 1), RequestState::Completed);
        assert!(r.advance(2, LINE, &states).unwrap());
        assert_eq!(r.state(), RequestState::Active);
        // Activation is free: no workload consumed.
        assert_eq!(r.remaining(), 2);

        assert!(r.advance(3, LINE, &states).unwrap());
        assert!(r.advance(4, LINE, &states).unwrap());
        assert_eq!(r.completion(), Some(4));
        assert_eq!(r.extra_duration(), Some(2));
    }

    #[test]
    fn test_waiting_without_dependencies_is_violation() {
        let mut r = Request::new(RequestId(9), 0, 2, false, Vec::new());
        r.state = RequestState::Waiting;

        let err = r.advance(1, LINE, &NoDependencies).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvariantViolation { request: RequestId(9), .. }
        ));
    }

    #[test]
    fn test_active_without_workload_is_violation() {
        let mut r = Request::new(RequestId(3), 0, 0, false, Vec::new());
        let err = r.advance(1, LINE, &NoDependencies).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvariantViolation { request: RequestId(3), .. }
        ));
        assert!(r.is_active());
        assert_eq!(r.completion(), None);
    }

    #[test]
    fn test_dangling_dependency_is_violation() {
        let mut r = Request::new(RequestId(1), 0, 2, false, vec![key(4, 4)]);
        let err = r.advance(1, LINE, &NoDependencies).unwrap_err();
        assert!(matches!(err, SimError::InvariantViolation { .. }));
    }

    #[test]
    fn test_states_never_reverse() {
        let mut r = Request::new(RequestId(1), 0, 2, false, vec![key(1, 1)]);
        let states = FixedStates(HashMap::from([(key(1, 1), RequestState::Completed)]));
        let mut seen = vec![r.state()];
        for now in 1..10 {
            r.advance(now, LINE, &states).unwrap();
            if seen.last() != Some(&r.state()) {
                seen.push(r.state());
            }
        }
        assert_eq!(
            seen,
            vec![
                RequestState::Waiting,
                RequestState::Active,
                RequestState::Completed
            ]
        );
    }
}
