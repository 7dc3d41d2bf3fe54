//! CLI command definitions

use crate::execution::SchedulingStrategy;
use clap::Args;
use serde_json::Value;
use std::path::PathBuf;

/// Run a flow
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to flow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Parameter values (key=value); values are parsed as JSON, else taken as strings
    #[arg(long, value_parser = parse_key_value)]
    pub param: Vec<(String, Value)>,

    /// Scheduling strategy
    #[arg(long, value_enum, default_value_t = SchedulingStrategyArg::Sequential)]
    pub strategy: SchedulingStrategyArg,

    /// Resume from a snapshot (default location when no path is given)
    #[arg(long)]
    pub resume: Option<Option<PathBuf>>,

    /// Save a snapshot after the run (default location when no path is given)
    #[arg(long)]
    pub save_state: Option<Option<PathBuf>>,

    /// Keep re-running while tasks are waiting to retry
    #[arg(long)]
    pub until_settled: bool,

    /// Maximum number of runs with --until-settled
    #[arg(long, default_value_t = 10)]
    pub max_passes: usize,
}

/// Validate a flow definition
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to flow YAML file
    #[arg(short, long)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Scheduling strategy argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SchedulingStrategyArg {
    Sequential,
    Parallel,
    #[clap(name = "parallel-limited")]
    ParallelLimited,
}

impl From<SchedulingStrategyArg> for SchedulingStrategy {
    fn from(arg: SchedulingStrategyArg) -> Self {
        match arg {
            SchedulingStrategyArg::Sequential => SchedulingStrategy::Sequential,
            SchedulingStrategyArg::Parallel => SchedulingStrategy::Parallel,
            SchedulingStrategyArg::ParallelLimited => SchedulingStrategy::LimitedParallel(4),
        }
    }
}

/// Parse key=value pairs
pub fn parse_key_value(s: &str) -> Result<(String, Value), String> {
    let (key, raw) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid key=value pair: {}", s))?;
    if key.is_empty() {
        return Err(format!("Missing key in: {}", s));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}
