//! Task domain model

use crate::core::{signal::TaskResult, trigger::Trigger};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Stable identity of a task; the key of every per-run state mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Resolved keyword inputs handed to a task body
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inputs(HashMap<String, Value>);

impl Inputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Deserialize an input into a concrete type
    pub fn value<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<T> {
        let value = self
            .0
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("missing input '{}'", key))?;
        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("input '{}' has the wrong type: {}", key, e))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for Inputs {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The work a task performs
#[async_trait]
pub trait TaskBody: Send + Sync {
    /// Run with resolved inputs; return a value, an error, or a signal
    async fn run(&self, inputs: Inputs) -> TaskResult;
}

struct FnBody<F>(F);

#[async_trait]
impl<F> TaskBody for FnBody<F>
where
    F: Fn(Inputs) -> TaskResult + Send + Sync,
{
    async fn run(&self, inputs: Inputs) -> TaskResult {
        (self.0)(inputs)
    }
}

struct Constant(Value);

#[async_trait]
impl TaskBody for Constant {
    async fn run(&self, _inputs: Inputs) -> TaskResult {
        Ok(self.0.clone())
    }
}

/// What kind of node a task is
#[derive(Clone)]
pub enum TaskKind {
    /// Runs a body
    Body(Arc<dyn TaskBody>),
    /// Takes its value from the run's parameters, by task name
    Parameter { default: Option<Value> },
}

/// A unit of work in a flow
#[derive(Clone)]
pub struct Task {
    id: TaskId,

    /// Display name; also the lookup key for parameters
    pub name: String,

    pub kind: TaskKind,

    /// Policy over upstream outcomes
    pub trigger: Trigger,

    /// Extra attempts allowed after a failure
    pub max_retries: u32,

    /// Delay before a retry may start
    pub retry_delay: Duration,

    /// Limit on a single attempt
    pub timeout: Option<Duration>,
}

impl Task {
    /// Create a task from a body
    pub fn new(name: impl Into<String>, body: impl TaskBody + 'static) -> Self {
        Self::with_kind(name, TaskKind::Body(Arc::new(body)))
    }

    /// Create a task from a synchronous closure
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Inputs) -> TaskResult + Send + Sync + 'static,
    {
        Self::new(name, FnBody(f))
    }

    /// Create a task that always returns `value`
    pub fn constant(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, Constant(value))
    }

    /// Create a required parameter
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::with_kind(name, TaskKind::Parameter { default: None })
    }

    /// Create a parameter falling back to `default` when not supplied
    pub fn parameter_with_default(name: impl Into<String>, default: Value) -> Self {
        Self::with_kind(
            name,
            TaskKind::Parameter {
                default: Some(default),
            },
        )
    }

    fn with_kind(name: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            id: TaskId::new(),
            name: name.into(),
            kind,
            trigger: Trigger::default(),
            max_retries: 0,
            retry_delay: Duration::ZERO,
            timeout: None,
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = trigger;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self.kind, TaskKind::Parameter { .. })
    }

    /// Whether `other` is this task with no setting changed
    pub(crate) fn same_definition(&self, other: &Task) -> bool {
        let same_kind = match (&self.kind, &other.kind) {
            (TaskKind::Body(a), TaskKind::Body(b)) => Arc::ptr_eq(a, b),
            (TaskKind::Parameter { default: a }, TaskKind::Parameter { default: b }) => a == b,
            _ => false,
        };
        same_kind
            && self.id == other.id
            && self.name == other.name
            && self.trigger.same_as(&other.trigger)
            && self.max_retries == other.max_retries
            && self.retry_delay == other.retry_delay
            && self.timeout == other.timeout
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            TaskKind::Body(_) => "body",
            TaskKind::Parameter { .. } => "parameter",
        };
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &kind)
            .field("trigger", &self.trigger)
            .field("max_retries", &self.max_retries)
            .field("retry_delay", &self.retry_delay)
            .field("timeout", &self.timeout)
            .finish()
    }
}
