//! CLI output formatting

use crate::{
    core::{Flow, State},
    execution::{ExecutionEvent, FlowState},
};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static SKIP: Emoji<'_, '_> = Emoji("⏭️  ", "- ");

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// A horizontal rule as wide as the terminal
pub fn separator() -> String {
    let width = term_size::dimensions_stdout()
        .map(|(w, _)| w)
        .unwrap_or(80);
    "─".repeat(width)
}

/// Format a state for display
pub fn format_state(state: &State) -> String {
    let label = state.name().to_uppercase();
    let label = if state.is_retrying() {
        style(format!("{} (run {})", label, state.run_count())).yellow()
    } else if state.is_trigger_failed() || state.is_failed() {
        style(label).red()
    } else if state.is_skipped() {
        style(label).dim()
    } else if state.is_successful() {
        style(label).green()
    } else {
        style(label).dim()
    };

    match &state.message {
        Some(message) => format!("{} {}", label, style(message).dim()),
        None => label.to_string(),
    }
}

fn icon(state: &State) -> Emoji<'static, 'static> {
    if state.is_skipped() {
        SKIP
    } else if state.is_successful() {
        CHECK
    } else if state.is_failed() {
        CROSS
    } else {
        SPINNER
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::FlowStarted { run_id, flow_name } => format!(
            "{} Starting flow {} ({})",
            ROCKET,
            style(flow_name).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::TaskStarted {
            task_name, attempt, ..
        } => {
            if *attempt > 1 {
                format!(
                    "{} {} (attempt {})",
                    SPINNER,
                    style(task_name).cyan(),
                    style(attempt).dim()
                )
            } else {
                format!("{} {}", SPINNER, style(task_name).cyan())
            }
        }
        ExecutionEvent::TaskFinished {
            task_name, state, ..
        } => format!("{} {}: {}", icon(state), style(task_name).bold(), format_state(state)),
        ExecutionEvent::TaskRetrying {
            task_name,
            run_count,
            start_time,
            ..
        } => format!(
            "{} {} will retry after run {} at {}",
            WARN,
            style(task_name).yellow(),
            run_count,
            style(start_time.format("%H:%M:%S")).dim()
        ),
        ExecutionEvent::TaskBlocked {
            task_name, reason, ..
        } => format!("{} {}: {}", INFO, style(task_name).yellow(), style(reason).dim()),
        ExecutionEvent::FlowFinished { run_id, state } => format!(
            "{} Flow ({}) {}",
            icon(state),
            style(&run_id.to_string()[..8]).dim(),
            format_state(state)
        ),
    }
}

/// Per-task summary lines, in dependency order
pub fn format_flow_state(flow: &Flow, result: &FlowState) -> Vec<String> {
    let mut lines: Vec<String> = flow
        .sorted_tasks()
        .into_iter()
        .filter_map(|id| {
            let task = flow.task(id)?;
            let state = result.data.get(&id)?;
            let mut line = format!("  {} {}: {}", icon(state), style(&task.name).bold(), format_state(state));
            if let Some(data) = &state.data {
                line.push_str(&format!(" {}", style(format_output(&data.to_string(), 80)).dim()));
            }
            Some(line)
        })
        .collect();

    for (id, error) in &result.errors {
        let name = flow.task(*id).map(|t| t.name.as_str()).unwrap_or("?");
        lines.push(format!("  {} {}: {}", WARN, style(name).yellow(), style(error).red()));
    }

    lines
}

/// Truncate a value for display
pub fn format_output(output: &str, max_chars: usize) -> String {
    if output.chars().count() <= max_chars {
        output.to_string()
    } else {
        let truncated: String = output.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
