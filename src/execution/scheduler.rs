//! Execution scheduler - determines which tasks to evaluate next

use crate::core::{Flow, TaskId};
use std::collections::HashSet;

/// Strategy for scheduling task evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingStrategy {
    /// Evaluate tasks in dependency order, one at a time
    #[default]
    Sequential,

    /// Evaluate all ready tasks concurrently
    Parallel,

    /// Limited parallelism (max N concurrent tasks)
    LimitedParallel(usize),
}

/// Scheduler for determining which tasks to evaluate
#[derive(Debug, Clone, Default)]
pub struct ExecutionScheduler {
    strategy: SchedulingStrategy,
}

impl ExecutionScheduler {
    pub fn new(strategy: SchedulingStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> SchedulingStrategy {
        self.strategy
    }

    /// Tasks not yet evaluated this run whose upstream tasks all have been,
    /// in `order`
    pub fn ready_tasks(
        &self,
        flow: &Flow,
        order: &[TaskId],
        evaluated: &HashSet<TaskId>,
    ) -> Vec<TaskId> {
        order
            .iter()
            .filter(|id| !evaluated.contains(id))
            .filter(|id| {
                flow.upstream_tasks(**id)
                    .iter()
                    .all(|up| evaluated.contains(up))
            })
            .copied()
            .collect()
    }

    /// Get the next batch of tasks to evaluate together
    pub fn next_batch(
        &self,
        flow: &Flow,
        order: &[TaskId],
        evaluated: &HashSet<TaskId>,
    ) -> Vec<TaskId> {
        let ready = self.ready_tasks(flow, order, evaluated);

        match self.strategy {
            SchedulingStrategy::Sequential => ready.into_iter().take(1).collect(),
            SchedulingStrategy::Parallel => ready,
            SchedulingStrategy::LimitedParallel(max) => ready.into_iter().take(max.max(1)).collect(),
        }
    }
}
