//! Command handlers.

use crate::config::CliConfig;
use cinder_core::run::{InstanceStatus, PipelineReport, RunState, StepStatus};
use cinder_core::workflow::WorkflowSpec;
use cinder_runner::{JobRunner, RunnerConfig, ShellRunner};
use cinder_scheduler::{MatrixExpander, Scheduler, TriggerEvent, WorkerPool};
use console::style;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Initialize a new workflow file.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new("cinder.yaml");

    if path.exists() {
        println!("{} cinder.yaml already exists", style("!").yellow());
        return Ok(());
    }

    let template = r#"name: ci

triggers:
  - type: push
    branches: ["main"]
  - type: pull_request

env:
  CARGO_TERM_COLOR: always

jobs:
  - name: lints
    steps:
      - name: fmt
        run: cargo fmt --all -- --check
      - name: clippy
        run: cargo clippy --all-targets -- -D warnings

  - name: test
    matrix:
      axes:
        - name: toolchain
          values: [stable, beta]
    steps:
      - name: build
        run: cargo +${{ matrix.toolchain }} build --verbose
      - name: test
        run: cargo +${{ matrix.toolchain }} test --verbose
"#;

    std::fs::write(path, template)?;
    println!("{} Created cinder.yaml", style("✓").green());
    Ok(())
}

/// Validate a workflow file.
pub async fn validate(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let spec = load_spec(path)?;

    println!(
        "{} Workflow \"{}\" is valid",
        style("✓").green(),
        spec.name
    );
    println!("  Jobs: {}", spec.jobs.len());

    for job in &spec.jobs {
        let cells = job
            .matrix
            .as_ref()
            .map(|m| m.axes.iter().map(|a| a.values.len()).product::<usize>())
            .unwrap_or(1);
        println!(
            "    - {} ({} steps, {} instances)",
            job.name,
            job.steps.len(),
            cells
        );
    }

    Ok(())
}

/// Print the deterministic expansion of a workflow without executing it.
pub async fn list_jobs(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let spec = load_spec(path)?;
    let instances = MatrixExpander::new().expand(&spec);

    println!(
        "Workflow {} expands to {} job instances:",
        style(&spec.name).bold(),
        instances.len()
    );

    for instance in &instances {
        if instance.variant.is_empty() {
            println!("  {}", instance.name);
        } else {
            let variant: Vec<String> = instance
                .variant
                .iter()
                .map(|(axis, value)| format!("{}={}", axis, value))
                .collect();
            println!("  {} ({})", instance.name, variant.join(", "));
        }
    }

    Ok(())
}

/// Run a workflow locally. Returns whether the caller should exit zero.
pub async fn run_workflow(
    config: &CliConfig,
    path: &str,
    event: &str,
    branch: &str,
    workers: Option<usize>,
    vars: Vec<String>,
    json: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut spec = load_spec(path)?;

    for var in vars {
        let (key, value) = parse_var(&var)?;
        spec.env.insert(key, value);
    }

    let event = parse_event(event, branch)?;

    let runner_config = RunnerConfig {
        default_timeout: config
            .timeout_seconds
            .map(Duration::from_secs)
            .or(RunnerConfig::default().default_timeout),
        grace_period: Duration::from_secs(config.grace_seconds),
    };
    let shell = Arc::new(ShellRunner::new(runner_config));
    let runner = Arc::new(JobRunner::new(shell, std::env::current_dir()?));
    let workers = workers.unwrap_or(config.workers);
    let scheduler = Scheduler::new(WorkerPool::new(workers), runner);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    println!(
        "\n{} Running workflow: {}",
        style("▶").cyan().bold(),
        style(&spec.name).bold()
    );
    println!("  {} jobs, {} workers\n", spec.jobs.len(), workers);

    let report = scheduler.run(&spec, &event, cancel).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(matches!(
        report.state,
        RunState::Succeeded | RunState::Skipped
    ))
}

/// Show current configuration.
pub fn show_config(config: &CliConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_yaml::to_string(config)?);
    Ok(())
}

/// Set a configuration value and persist it.
pub fn set_config(key: &str, value: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = CliConfig::load().unwrap_or_default();
    config.set(key, value)?;
    config.save()?;
    println!("{} Set {} = {}", style("✓").green(), key, value);
    Ok(())
}

fn load_spec(path: &str) -> Result<WorkflowSpec, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(WorkflowSpec::from_yaml(&content)?)
}

fn parse_event(kind: &str, branch: &str) -> Result<TriggerEvent, String> {
    match kind {
        "push" => Ok(TriggerEvent::push(branch)),
        "pull_request" | "pr" => Ok(TriggerEvent::pull_request(branch)),
        other => Err(format!(
            "Unknown event kind: {} (expected push or pull_request)",
            other
        )),
    }
}

fn parse_var(var: &str) -> Result<(String, String), String> {
    match var.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("Invalid variable (expected KEY=VALUE): {}", var)),
    }
}

fn print_report(report: &PipelineReport) {
    if report.state == RunState::Skipped {
        println!(
            "{} Workflow {} skipped: trigger rules did not match",
            style("⏭").dim(),
            style(&report.workflow_name).bold()
        );
        return;
    }

    for instance in &report.instances {
        let marker = match instance.status {
            InstanceStatus::Passed => style("✓").green().bold(),
            InstanceStatus::Failed => style("✗").red().bold(),
            InstanceStatus::Cancelled => style("⊘").yellow().bold(),
        };
        println!(
            "{} {} ({:.2}s)",
            marker,
            style(&instance.instance_name).bold(),
            instance.duration_ms as f64 / 1000.0
        );

        for record in &instance.steps {
            let step_marker = match record.status {
                StepStatus::Passed => style("·").green(),
                StepStatus::Failed => style("✗").red(),
                StepStatus::Cancelled => style("⊘").yellow(),
            };
            match (record.exit_code, &record.error) {
                (Some(code), _) if record.status != StepStatus::Passed => {
                    println!("    {} {} (exit {})", step_marker, record.name, code);
                }
                (_, Some(error)) => {
                    println!("    {} {} ({})", step_marker, record.name, error);
                }
                _ => println!("    {} {}", step_marker, record.name),
            }
        }

        if let Some(error) = &instance.error {
            println!("    {} {}", style("✗").red(), error);
        }
    }

    println!();
    let passed = report.instances.iter().filter(|i| i.passed()).count();
    let summary = format!(
        "{}/{} instances passed in {:.2}s",
        passed,
        report.instances.len(),
        report.duration_ms as f64 / 1000.0
    );

    match report.state {
        RunState::Succeeded => {
            println!("{} Pipeline succeeded: {}", style("✓").green().bold(), summary);
        }
        RunState::Cancelled => {
            println!("{} Pipeline cancelled: {}", style("⊘").yellow().bold(), summary);
        }
        _ => {
            println!("{} Pipeline failed: {}", style("✗").red().bold(), summary);
        }
    }
}
