//! `schedule` CLI — expand, materialize, and export class-session schedules.
//!
//! ## Usage
//!
//! ```sh
//! # Expand a session template into candidate windows (stdin → stdout)
//! cat template.json | schedule expand
//!
//! # Materialize templates against existing bookings
//! schedule materialize -i request.json -o result.json
//!
//! # Use a custom engine configuration
//! schedule --config engine.json materialize -i request.json
//!
//! # Render a template as an RFC 5545 RRULE block
//! schedule export -i template.json
//! ```
//!
//! Logs go to stderr and are controlled with `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use session_scheduler::timetable::InMemoryTimetable;
use session_scheduler::{Scheduler, SchedulerConfig, Scope, SessionTemplate};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "schedule",
    version,
    about = "Class-session recurrence expansion and conflict resolution"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON); defaults apply when omitted
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand a session template into candidate windows
    Expand {
        /// Input template file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Materialize templates against a set of existing bookings
    Materialize {
        /// Input request file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Render a session template as RFC 5545 DTSTART + RRULE text
    Export {
        /// Input template file (reads from stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,
        /// Output file (writes to stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

/// Body of `schedule materialize`: the class-creation inputs plus the bookings
/// to check them against.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MaterializeRequest {
    scope: Scope,
    templates: Vec<SessionTemplate>,
    #[serde(flatten)]
    timetable: InMemoryTimetable,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CandidateDto {
    sequence_number: u32,
    start: String,
    end: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Expand { input, output } => {
            let template = read_template(input.as_deref())?;
            let candidates: Vec<CandidateDto> =
                session_scheduler::expand_template(&template, &config)
                    .context("Failed to expand template")?
                    .map(|c| CandidateDto {
                        sequence_number: c.sequence_number,
                        start: c.window.start.to_rfc3339(),
                        end: c.window.end.to_rfc3339(),
                    })
                    .collect();
            let json = serde_json::to_string_pretty(&candidates)?;
            write_output(output.as_deref(), &json)?;
        }
        Commands::Materialize { input, output } => {
            let raw = read_input(input.as_deref())?;
            let request: MaterializeRequest =
                serde_json::from_str(&raw).context("Invalid materialize request JSON")?;
            tracing::info!(
                templates = request.templates.len(),
                bookings = request.timetable.bookings.len(),
                "materializing"
            );

            let scheduler = Scheduler::with_config(request.timetable, config);
            let result = scheduler
                .materialize(&request.templates, &request.scope)
                .context("Failed to materialize schedule")?;
            let json = serde_json::to_string_pretty(&result)?;
            write_output(output.as_deref(), &json)?;
        }
        Commands::Export { input, output } => {
            let template = read_template(input.as_deref())?;
            let text = session_scheduler::export_rrule(&template, &config)
                .context("Failed to export template")?;
            write_output(output.as_deref(), &text)?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&str>) -> Result<SchedulerConfig> {
    match path {
        None => Ok(SchedulerConfig::default()),
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path))?;
            SchedulerConfig::from_json(&raw)
                .with_context(|| format!("Invalid config file: {}", path))
        }
    }
}

fn read_template(path: Option<&str>) -> Result<SessionTemplate> {
    let raw = read_input(path)?;
    serde_json::from_str(&raw).context("Invalid session template JSON")
}

fn read_input(path: Option<&str>) -> Result<String> {
    match path {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))
        }
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read from stdin")?;
            Ok(buf)
        }
    }
}

fn write_output(path: Option<&str>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write file: {}", path))?;
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
