//! `planner`: watch, replay and analyze plan-generation runs from the terminal.

mod commands;
mod config;
mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use planner_telemetry::observability::{Verbosity, init_with_verbosity};

/// Plan-generation run monitor
#[derive(Parser, Debug)]
#[command(name = "planner", version, about)]
struct Cli {
    /// Raise planner log verbosity (-v debug, -vv trace); PLANNER_LOG_LEVEL wins
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream a live run and print its progress (Ctrl-C cancels)
    Watch {
        /// Profile that owns the plan
        #[arg(long)]
        profile_id: String,
        /// Technology the plan targets
        #[arg(long)]
        subject: String,
        /// Prefer a faster, shallower plan
        #[arg(long)]
        fast: bool,
        /// Planning service base URL (overrides PLANNER_STREAM_BASE_URL)
        #[arg(long)]
        base_url: Option<String>,
    },
    /// Replay a recorded SSE transcript through the run client
    Replay {
        /// Transcript file in text/event-stream format
        transcript: PathBuf,
        /// Bytes delivered per simulated network read
        #[arg(long, default_value = "64")]
        chunk_size: usize,
    },
    /// Analyze an action trace (JSON array of action records)
    Analyze {
        trace: PathBuf,
        /// Print the step graph in Graphviz DOT format instead of the report
        #[arg(long, conflicts_with = "json")]
        dot: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    config::init();
    let cli = Cli::parse();
    init_with_verbosity(Verbosity::from_occurrences(cli.verbose));

    let outcome = match cli.command {
        Command::Watch {
            profile_id,
            subject,
            fast,
            base_url,
        } => commands::watch::run(profile_id, subject, fast, base_url).await,
        Command::Replay {
            transcript,
            chunk_size,
        } => commands::replay::run(&transcript, chunk_size).await,
        Command::Analyze { trace, dot, json } => {
            let format = if dot {
                commands::analyze::Format::Dot
            } else if json {
                commands::analyze::Format::Json
            } else {
                commands::analyze::Format::Text
            };
            commands::analyze::run(&trace, format, &mut std::io::stdout().lock())
        }
    };

    match outcome {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
