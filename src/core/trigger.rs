//! Triggers decide whether a task may run given its upstream states

use crate::core::{state::State, task::TaskId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Snapshot of a task's upstream states
pub type UpstreamStates = HashMap<TaskId, State>;

type CheckFn = dyn Fn(&UpstreamStates) -> Result<(), String> + Send + Sync;

/// Result of evaluating a trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerDecision {
    /// Some upstream task has not finished; no decision yet
    Wait,
    /// The task may run
    Run,
    /// The task must not run
    Deny(String),
}

/// Policy over upstream outcomes
///
/// The check only ever sees finished upstream states: while any upstream task
/// is unfinished, [`Trigger::evaluate`] answers [`TriggerDecision::Wait`]
/// without consulting it.
#[derive(Clone)]
pub struct Trigger {
    name: String,
    check: Arc<CheckFn>,
}

impl Trigger {
    /// Build a trigger from a check returning the denial reason on failure
    pub fn new<F>(name: impl Into<String>, check: F) -> Self
    where
        F: Fn(&UpstreamStates) -> Result<(), String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            check: Arc::new(check),
        }
    }

    /// Runs iff every upstream task succeeded (skipped counts as success)
    pub fn all_successful() -> Self {
        Self::new("all_successful", |upstream| {
            let failed = upstream.values().filter(|s| !s.is_successful()).count();
            if failed == 0 {
                Ok(())
            } else {
                Err(format!("{} upstream task(s) did not succeed", failed))
            }
        })
    }

    /// Runs iff every upstream task failed
    pub fn all_failed() -> Self {
        Self::new("all_failed", |upstream| {
            let succeeded = upstream.values().filter(|s| !s.is_failed()).count();
            if succeeded == 0 {
                Ok(())
            } else {
                Err(format!("{} upstream task(s) did not fail", succeeded))
            }
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same trigger, not merely one with the same name
    pub(crate) fn same_as(&self, other: &Trigger) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.check, &other.check)
    }

    /// Evaluate against an atomic snapshot of upstream states
    pub fn evaluate(&self, upstream: &UpstreamStates) -> TriggerDecision {
        if upstream.values().any(|s| !s.is_finished()) {
            return TriggerDecision::Wait;
        }

        match (self.check)(upstream) {
            Ok(()) => TriggerDecision::Run,
            Err(reason) => {
                TriggerDecision::Deny(format!("Trigger '{}' failed: {}", self.name, reason))
            }
        }
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::all_successful()
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trigger").field("name", &self.name).finish()
    }
}
