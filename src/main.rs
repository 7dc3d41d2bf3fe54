use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use taskflow::cli::commands::{RunCommand, ValidateCommand};
use taskflow::cli::output::*;
use taskflow::cli::{Cli, Command};
use taskflow::core::config::FlowConfig;
use taskflow::core::Flow;
use taskflow::execution::{ExecutionEvent, FlowRunner, RunOptions};
use taskflow::persistence::RunSnapshot;
use tracing::{error, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_lowercase()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let succeeded = match &cli.command {
        Command::Run(cmd) => run_flow(cmd).await?,
        Command::Validate(cmd) => validate_flow(cmd)?,
    };

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

fn snapshot_path(flag: &Option<PathBuf>, flow: &Flow) -> Result<PathBuf> {
    match flag {
        Some(path) => Ok(path.clone()),
        None => RunSnapshot::default_path(&flow.name).context("No snapshot path available"),
    }
}

async fn run_flow(cmd: &RunCommand) -> Result<bool> {
    // Load flow config
    let config = FlowConfig::from_file(&cmd.file).context("Failed to load flow config")?;
    println!("{} Loaded flow: {}", INFO, style(&config.name).bold());

    let flow = Arc::new(config.to_flow().context("Failed to build flow")?);
    let all_tasks: Vec<_> = flow.tasks().map(|t| t.id()).collect();

    let mut options = RunOptions::new().return_tasks(all_tasks.iter().copied());
    for (key, value) in &cmd.param {
        println!(
            "{} Parameter: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
        options = options.with_parameter(key.clone(), value.clone());
    }

    if let Some(flag) = &cmd.resume {
        let path = snapshot_path(flag, &flow)?;
        let snapshot = RunSnapshot::load(&path)
            .await
            .with_context(|| format!("Failed to load snapshot {}", path.display()))?;
        println!(
            "{} Resuming run {} from {}",
            INFO,
            style(&snapshot.run_id.to_string()[..8]).dim(),
            style(path.display()).dim()
        );
        options = options.with_task_states(snapshot.task_states_for(&flow)?);
    }

    let progress = create_progress_bar(all_tasks.len());
    let bar = progress.clone();
    let runner = FlowRunner::new(flow.clone())
        .with_strategy(cmd.strategy.into())
        .with_event_handler(move |event| {
            if let ExecutionEvent::TaskFinished { .. } = &event {
                bar.inc(1);
            }
            bar.println(format_execution_event(&event));
        });

    println!();
    let result = if cmd.until_settled {
        runner.run_until_settled(options, cmd.max_passes).await
    } else {
        runner.run(options).await
    };
    progress.finish_and_clear();

    println!("{}", style(separator()).dim());
    for line in format_flow_state(&flow, &result) {
        println!("{}", line);
    }

    if let Some(flag) = &cmd.save_state {
        let path = snapshot_path(flag, &flow)?;
        RunSnapshot::capture(&flow, &result)
            .save(&path)
            .await
            .with_context(|| format!("Failed to save snapshot {}", path.display()))?;
        println!("\n{} Run state saved to {}", INFO, style(path.display()).dim());
    }

    // Print final status
    if result.is_successful() {
        println!(
            "\n{} {} completed {}",
            CHECK,
            style(&flow.name).bold(),
            style("successfully").green()
        );
    } else if result.is_pending() {
        println!(
            "\n{} {} is {}: {}",
            SPINNER,
            style(&flow.name).bold(),
            style("pending").yellow(),
            result.message().unwrap_or_default()
        );
    } else {
        println!(
            "\n{} {} {}",
            CROSS,
            style(&flow.name).bold(),
            style("failed").red()
        );
        error!("{}", result.message().unwrap_or("flow failed"));
    }

    Ok(result.is_successful())
}

fn validate_flow(cmd: &ValidateCommand) -> Result<bool> {
    println!("{} Validating flow...", INFO);

    match FlowConfig::from_file(Path::new(&cmd.file)).and_then(|c| c.to_flow().map(|f| (c, f))) {
        Ok((config, flow)) => {
            println!("{} Flow definition is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Tasks: {}", style(config.tasks.len()).cyan());
            println!("  Parameters: {}", style(config.parameters.len()).cyan());
            println!("  Edges: {}", style(flow.edges().len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", json);
            }
            Ok(true)
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            Ok(false)
        }
    }
}
