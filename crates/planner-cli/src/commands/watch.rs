use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use planner_stream::{PlanClient, RunParameters, SseTransport, SseTransportConfig};

use super::{ConsoleObserver, drive_run, exit_code, write_outcome};

/// Streams a live run from the planning service.
///
/// `--base-url` overrides `PLANNER_STREAM_BASE_URL`; the other transport settings
/// still come from the environment when present.
pub async fn run(
    profile_id: String,
    subject: String,
    fast: bool,
    base_url: Option<String>,
) -> anyhow::Result<ExitCode> {
    let config = transport_config(base_url)?;
    let transport =
        SseTransport::new(config).context("failed to configure the stream transport")?;
    let client = PlanClient::builder().transport(Arc::new(transport)).build()?;

    let mut observer = ConsoleObserver::new(std::io::stdout());
    let params = RunParameters::new(profile_id, subject).fast_mode(fast);
    let run = drive_run(&client, params, &mut observer)
        .await
        .context("failed to start the plan stream")?;

    let mut out = observer.into_inner();
    write_outcome(run.state(), &mut out)?;
    Ok(exit_code(run.state()))
}

fn transport_config(base_url: Option<String>) -> anyhow::Result<SseTransportConfig> {
    transport_config_from(base_url, |key| std::env::var(key).ok())
}

fn transport_config_from(
    base_url: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<SseTransportConfig> {
    match base_url {
        Some(url) => SseTransportConfig::new(url)
            .overrides_from(lookup)
            .context("invalid stream transport settings in the environment"),
        None => SseTransportConfig::from_lookup(lookup).context(
            "set PLANNER_STREAM_BASE_URL or pass --base-url to reach the planning service",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn vars(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn base_url_flag_keeps_env_path_and_timeout() {
        let config = transport_config_from(
            Some("http://flag.example".into()),
            vars(&[
                ("PLANNER_STREAM_PATH", "/custom/stream"),
                ("PLANNER_CONNECT_TIMEOUT_SECS", "3"),
            ]),
        )
        .expect("config");
        assert_eq!(config.base_url, "http://flag.example");
        assert_eq!(config.stream_path, "/custom/stream");
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
    }

    #[test]
    fn base_url_flag_wins_over_env() {
        let config = transport_config_from(
            Some("http://flag.example".into()),
            vars(&[("PLANNER_STREAM_BASE_URL", "http://env.example")]),
        )
        .expect("config");
        assert_eq!(config.base_url, "http://flag.example");
    }

    #[test]
    fn invalid_timeout_is_not_swallowed() {
        let result = transport_config_from(
            Some("http://flag.example".into()),
            vars(&[("PLANNER_CONNECT_TIMEOUT_SECS", "ten")]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_base_url_is_reported() {
        assert!(transport_config_from(None, vars(&[])).is_err());
    }
}
