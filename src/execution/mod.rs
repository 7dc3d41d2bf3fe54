//! Flow execution engine

pub mod events;
pub mod flow_runner;
pub mod scheduler;
pub mod task_runner;

pub use events::{EventEmitter, EventHandler, ExecutionEvent};
pub use flow_runner::{FlowRunner, FlowState, RunOptions};
pub use scheduler::{ExecutionScheduler, SchedulingStrategy};
pub use task_runner::{TaskRun, TaskRunner};
