//! Flow domain model: an immutable DAG of tasks

use crate::core::{
    error::FlowError,
    task::{Task, TaskId},
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A dependency between two tasks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub upstream: TaskId,
    pub downstream: TaskId,
    /// Keyword under which the upstream result is passed to the downstream body
    pub key: Option<String>,
}

/// A flow definition
#[derive(Debug, Clone, Default)]
pub struct Flow {
    /// Flow name
    pub name: String,

    tasks: HashMap<TaskId, Arc<Task>>,

    /// Insertion order, for deterministic iteration
    order: Vec<TaskId>,

    edges: Vec<Edge>,
}

impl Flow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a task; adding the same task twice is a no-op
    ///
    /// A changed copy of an added task is rejected rather than ignored.
    pub fn add_task(&mut self, task: Task) -> Result<TaskId, FlowError> {
        let id = task.id();
        if let Some(existing) = self.tasks.get(&id) {
            if existing.same_definition(&task) {
                return Ok(id);
            }
            return Err(FlowError::DuplicateTaskName(task.name));
        }
        if self.task_by_name(&task.name).is_some() {
            return Err(FlowError::DuplicateTaskName(task.name));
        }

        self.tasks.insert(id, Arc::new(task));
        self.order.push(id);
        Ok(id)
    }

    /// Add a dependency, optionally binding the upstream result to `key`
    pub fn add_edge(
        &mut self,
        upstream: TaskId,
        downstream: TaskId,
        key: Option<&str>,
    ) -> Result<(), FlowError> {
        let up = self.task(upstream).ok_or(FlowError::UnknownTask(upstream))?;
        let down = self
            .task(downstream)
            .ok_or(FlowError::UnknownTask(downstream))?;

        if down.is_parameter() {
            return Err(FlowError::ParameterHasUpstream(down.name.clone()));
        }

        if let Some(key) = key {
            let taken = self
                .upstream_edges(downstream)
                .any(|e| e.key.as_deref() == Some(key));
            if taken {
                return Err(FlowError::DuplicateKeyword {
                    task: down.name.clone(),
                    key: key.to_string(),
                });
            }
        }

        if upstream == downstream || self.reaches(downstream, upstream) {
            return Err(FlowError::Cycle {
                upstream: up.name.clone(),
                downstream: down.name.clone(),
            });
        }

        self.edges.push(Edge {
            upstream,
            downstream,
            key: key.map(str::to_string),
        });
        Ok(())
    }

    /// Wire `task` to plain upstream dependencies and keyword-bound ones
    pub fn set_dependencies(
        &mut self,
        task: TaskId,
        upstream: &[TaskId],
        keyword: &[(&str, TaskId)],
    ) -> Result<(), FlowError> {
        for &up in upstream {
            self.add_edge(up, task, None)?;
        }
        for &(key, up) in keyword {
            self.add_edge(up, task, Some(key))?;
        }
        Ok(())
    }

    /// Get a task by ID
    pub fn task(&self, id: TaskId) -> Option<&Arc<Task>> {
        self.tasks.get(&id)
    }

    /// Get a task by name
    pub fn task_by_name(&self, name: &str) -> Option<&Arc<Task>> {
        self.tasks().find(|t| t.name == name)
    }

    /// All tasks, in insertion order
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Edges pointing into `id`
    pub fn upstream_edges(&self, id: TaskId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.downstream == id)
    }

    /// Distinct upstream tasks of `id`
    pub fn upstream_tasks(&self, id: TaskId) -> Vec<TaskId> {
        let mut seen = HashSet::new();
        self.upstream_edges(id)
            .map(|e| e.upstream)
            .filter(|up| seen.insert(*up))
            .collect()
    }

    /// Distinct downstream tasks of `id`
    pub fn downstream_tasks(&self, id: TaskId) -> Vec<TaskId> {
        let mut seen = HashSet::new();
        self.edges
            .iter()
            .filter(|e| e.upstream == id)
            .map(|e| e.downstream)
            .filter(|down| seen.insert(*down))
            .collect()
    }

    /// Tasks with no downstream dependents; they decide the flow's outcome
    pub fn terminal_tasks(&self) -> Vec<TaskId> {
        let has_downstream: HashSet<TaskId> = self.edges.iter().map(|e| e.upstream).collect();
        self.order
            .iter()
            .filter(|id| !has_downstream.contains(id))
            .copied()
            .collect()
    }

    /// Parameter tasks
    pub fn parameters(&self) -> impl Iterator<Item = &Arc<Task>> {
        self.tasks().filter(|t| t.is_parameter())
    }

    /// Tasks in dependency order (every task after all of its upstream tasks)
    pub fn sorted_tasks(&self) -> Vec<TaskId> {
        let mut result = Vec::new();
        let mut visited = HashSet::new();

        for &id in &self.order {
            self.visit(id, &mut visited, &mut result);
        }

        result
    }

    fn visit(&self, id: TaskId, visited: &mut HashSet<TaskId>, result: &mut Vec<TaskId>) {
        if !visited.insert(id) {
            return;
        }

        for up in self.upstream_tasks(id) {
            self.visit(up, visited, result);
        }

        result.push(id);
    }

    /// Whether `to` is reachable from `from` along downstream edges
    fn reaches(&self, from: TaskId, to: TaskId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if seen.insert(current) {
                stack.extend(self.downstream_tasks(current));
            }
        }

        false
    }
}
