//! Execution state models
//!
//! A [`State`] is an immutable value: every transition builds a new one. The
//! variant tag lives in [`StateKind`]; callers classify states through the
//! predicates (`is_finished`, `is_successful`, `is_failed`, ...) rather than
//! by comparing tags, because `Skipped` counts as a success and
//! `TriggerFailed` counts as a failure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Variant of a state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateKind {
    /// Not yet run (or blocked on upstream work)
    Pending,
    /// Pending, with a time before which it should not start
    Scheduled { start_time: DateTime<Utc> },
    /// Pending another attempt after a failed one
    Retrying {
        run_count: u32,
        start_time: DateTime<Utc>,
    },
    /// The task body is executing
    Running,
    /// Finished successfully
    Success,
    /// Finished without doing work; counts as a success
    Skipped,
    /// Finished with an error
    Failed,
    /// Never ran because its trigger denied it; counts as a failure
    TriggerFailed,
}

/// State of a task or a flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub kind: StateKind,

    /// Result payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Human readable explanation, usually the error text for failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Whether the payload was carried over rather than computed
    #[serde(default)]
    pub cached: bool,
}

impl State {
    fn of(kind: StateKind) -> Self {
        Self {
            kind,
            data: None,
            message: None,
            cached: false,
        }
    }

    pub fn pending() -> Self {
        Self::of(StateKind::Pending)
    }

    pub fn scheduled(start_time: DateTime<Utc>) -> Self {
        Self::of(StateKind::Scheduled { start_time })
    }

    pub fn retrying(run_count: u32, start_time: DateTime<Utc>) -> Self {
        Self::of(StateKind::Retrying {
            run_count,
            start_time,
        })
    }

    /// Not produced by the runner; an attempt in flight shows up as a `TaskStarted` event
    pub fn running() -> Self {
        Self::of(StateKind::Running)
    }

    pub fn success() -> Self {
        Self::of(StateKind::Success)
    }

    pub fn skipped() -> Self {
        Self::of(StateKind::Skipped)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::of(StateKind::Failed).with_message(message)
    }

    pub fn trigger_failed(message: impl Into<String>) -> Self {
        Self::of(StateKind::TriggerFailed).with_message(message)
    }

    /// Attach a result payload
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Mark the payload as carried over from an earlier run
    pub fn with_cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// `Pending`, `Scheduled` or `Retrying`
    pub fn is_pending(&self) -> bool {
        matches!(
            self.kind,
            StateKind::Pending | StateKind::Scheduled { .. } | StateKind::Retrying { .. }
        )
    }

    pub fn is_retrying(&self) -> bool {
        matches!(self.kind, StateKind::Retrying { .. })
    }

    /// Terminal: no further transition happens within a run
    pub fn is_finished(&self) -> bool {
        self.is_successful() || self.is_failed()
    }

    /// `Success` or `Skipped`
    pub fn is_successful(&self) -> bool {
        matches!(self.kind, StateKind::Success | StateKind::Skipped)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.kind, StateKind::Skipped)
    }

    /// `Failed` or `TriggerFailed`
    pub fn is_failed(&self) -> bool {
        matches!(self.kind, StateKind::Failed | StateKind::TriggerFailed)
    }

    pub fn is_trigger_failed(&self) -> bool {
        matches!(self.kind, StateKind::TriggerFailed)
    }

    /// Attempts already made; zero unless retrying
    pub fn run_count(&self) -> u32 {
        match self.kind {
            StateKind::Retrying { run_count, .. } => run_count,
            _ => 0,
        }
    }

    /// Earliest start time for scheduled and retrying states
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        match self.kind {
            StateKind::Scheduled { start_time } | StateKind::Retrying { start_time, .. } => {
                Some(start_time)
            }
            _ => None,
        }
    }

    /// Variant name
    pub fn name(&self) -> &'static str {
        match self.kind {
            StateKind::Pending => "Pending",
            StateKind::Scheduled { .. } => "Scheduled",
            StateKind::Retrying { .. } => "Retrying",
            StateKind::Running => "Running",
            StateKind::Success => "Success",
            StateKind::Skipped => "Skipped",
            StateKind::Failed => "Failed",
            StateKind::TriggerFailed => "TriggerFailed",
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::pending()
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        match (&self.data, &self.message) {
            (Some(data), _) => write!(f, "(data={})", data),
            (None, Some(message)) => write!(f, "(message={})", message),
            (None, None) => Ok(()),
        }
    }
}
