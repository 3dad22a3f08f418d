//! Process-wide `tracing` setup for the planner binaries and examples.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_FILE: &str = "planner.logs.jsonl";

/// Planner crates at `info`, everything else (reqwest, hyper, rustls) at `warn`.
pub const DEFAULT_DIRECTIVES: &str =
    "warn,planner_stream=info,planner_telemetry=info,planner_cli=info";

/// How chatty the planner crates are when no filter is set in the environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Verbosity {
    #[default]
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    /// Maps a repeated `-v` flag count.
    pub fn from_occurrences(count: u8) -> Self {
        match count {
            0 => Verbosity::Normal,
            1 => Verbosity::Debug,
            _ => Verbosity::Trace,
        }
    }

    pub fn directives(self) -> &'static str {
        match self {
            Verbosity::Normal => DEFAULT_DIRECTIVES,
            Verbosity::Debug => {
                "warn,planner_stream=debug,planner_telemetry=debug,planner_cli=debug"
            }
            Verbosity::Trace => {
                "info,planner_stream=trace,planner_telemetry=trace,planner_cli=trace"
            }
        }
    }
}

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn logging_enabled() -> bool {
    ["PLANNER_OBSERVABILITY_ENABLED", "PLANNER_OBSERVABILITY"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok())
        .map(|value| parse_bool_env(&value).unwrap_or(true))
        .unwrap_or(true)
}

/// `PLANNER_LOG_LEVEL`, then `RUST_LOG`, then the verbosity's planner directives.
fn resolve_filter(
    planner_level: Option<&str>,
    rust_log: Option<&str>,
    verbosity: Verbosity,
) -> EnvFilter {
    [planner_level, rust_log]
        .into_iter()
        .flatten()
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(verbosity.directives()))
}

/// Splits a JSONL log path into the directory to create and the file name.
fn log_file_target(path: &Path) -> (PathBuf, String) {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(DEFAULT_LOG_FILE)
        .to_string();
    (dir, file_name)
}

/// Initializes logging with [`Verbosity::Normal`]. See [`init_with_verbosity`].
pub fn init_observability() {
    init_with_verbosity(Verbosity::Normal);
}

/// Initializes logging once per process; later calls are no-ops.
///
/// Environment variables:
/// - `PLANNER_OBSERVABILITY_ENABLED` / `PLANNER_OBSERVABILITY`: set to a false value to
///   disable logging (default enabled).
/// - `PLANNER_LOG_LEVEL`, then `RUST_LOG`: filter directives; they replace the
///   verbosity default.
/// - `PLANNER_JSON_LOG_PATH`: write JSONL to this file instead of compact lines on
///   stderr. If the directory cannot be created, logging stays on stderr and says so.
pub fn init_with_verbosity(verbosity: Verbosity) {
    INIT.get_or_init(|| {
        if !logging_enabled() {
            return;
        }

        let filter = resolve_filter(
            std::env::var("PLANNER_LOG_LEVEL").ok().as_deref(),
            std::env::var("RUST_LOG").ok().as_deref(),
            verbosity,
        );

        let mut file_failure = None;
        if let Ok(raw) = std::env::var("PLANNER_JSON_LOG_PATH") {
            let (dir, file_name) = log_file_target(Path::new(&raw));
            match std::fs::create_dir_all(&dir) {
                Ok(()) => {
                    let json_layer = tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(tracing_appender::rolling::never(dir, file_name));
                    let _ = tracing_subscriber::registry()
                        .with(filter)
                        .with(json_layer)
                        .try_init();
                    return;
                }
                Err(err) => file_failure = Some((raw, err)),
            }
        }

        let console_layer = tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr);
        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(console_layer)
            .try_init();
        if let Some((path, err)) = file_failure {
            tracing::warn!(
                path = %path,
                error = %err,
                "cannot create JSON log directory; logging to stderr"
            );
        }
    });
}
