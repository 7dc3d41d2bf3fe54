//! Execution events emitted while a flow runs

use crate::core::{State, TaskId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Events that can occur during a flow run
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    FlowStarted {
        run_id: Uuid,
        flow_name: String,
    },
    TaskStarted {
        task_id: TaskId,
        task_name: String,
        attempt: u32,
    },
    TaskFinished {
        task_id: TaskId,
        task_name: String,
        state: State,
    },
    TaskRetrying {
        task_id: TaskId,
        task_name: String,
        run_count: u32,
        start_time: DateTime<Utc>,
    },
    TaskBlocked {
        task_id: TaskId,
        task_name: String,
        reason: String,
    },
    FlowFinished {
        run_id: Uuid,
        state: State,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// Fans events out to registered handlers
#[derive(Clone, Default)]
pub struct EventEmitter {
    handlers: Vec<EventHandler>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event handler
    pub fn subscribe<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.handlers.push(Arc::new(handler));
    }

    /// Emit an event to all handlers
    pub fn emit(&self, event: ExecutionEvent) {
        for handler in &self.handlers {
            handler(event.clone());
        }
    }
}
