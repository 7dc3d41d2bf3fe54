//! Core domain models for taskflow
//!
//! This module defines the fundamental data structures: tasks and the flow
//! graph connecting them, execution states, signals and triggers.

pub mod config;
pub mod context;
pub mod error;
pub mod flow;
pub mod signal;
pub mod state;
pub mod task;
pub mod trigger;

pub use context::*;
pub use error::*;
pub use flow::*;
pub use signal::*;
pub use state::*;
pub use task::*;
pub use trigger::*;
