//! Scenario-based tests for taskflow

mod aggregation;
mod resume;
mod retry_behavior;
mod signals;
