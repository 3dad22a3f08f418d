use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context as _;
use planner_stream::{PlanClient, ReplayTransport, RunParameters, RunState};

use super::{ConsoleObserver, drive_run, exit_code, write_outcome};

const REPLAY_PROFILE: &str = "replay";

/// Replays a recorded transcript through the same client and reducer as `watch`.
pub async fn run(transcript: &Path, chunk_size: usize) -> anyhow::Result<ExitCode> {
    let state = replay_into(transcript, chunk_size, std::io::stdout()).await?;
    Ok(exit_code(&state))
}

pub(crate) async fn replay_into<W: std::io::Write>(
    transcript: &Path,
    chunk_size: usize,
    out: W,
) -> anyhow::Result<RunState> {
    let bytes = std::fs::read(transcript)
        .with_context(|| format!("failed to read transcript {}", transcript.display()))?;
    let client = PlanClient::builder()
        .transport(Arc::new(ReplayTransport::new(bytes).chunk_size(chunk_size)))
        .build()?;

    let subject = transcript
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.trim().is_empty())
        .unwrap_or_else(|| "transcript".to_string());
    let mut observer = ConsoleObserver::new(out);
    let run = drive_run(&client, RunParameters::new(REPLAY_PROFILE, subject), &mut observer).await?;

    let mut out = observer.into_inner();
    write_outcome(run.state(), &mut out)?;
    Ok(run.state().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use planner_stream::RunPhase;
    use std::io::Write as _;

    fn transcript(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        file.write_all(body.as_bytes()).expect("write transcript");
        file
    }

    #[tokio::test]
    async fn completed_transcript_exits_successfully() {
        let file = transcript(concat!(
            "event: agent_started\ndata: {}\n\n",
            "event: action_executed\ndata: {\"actionName\":\"fetch prerequisites\"}\n\n",
            "event: agent_completed\ndata: {\"result\":{\"curriculum\":[\"Ownership\"],",
            "\"path\":\"systems\",\"generationTimeSeconds\":3.5,\"estimatedCost\":0.01}}\n\n",
        ));
        let mut out = Vec::new();
        let state = replay_into(file.path(), 7, &mut out).await.expect("replay");
        let text = String::from_utf8(out).expect("utf8");

        assert_eq!(state.phase(), RunPhase::Completed);
        assert!(text.contains("fetch prerequisites"));
        assert!(text.contains("Learning path: systems"));
        assert!(text.contains("Status: Plan ready (100%)"));
    }

    #[tokio::test]
    async fn errored_transcript_fails() {
        let file = transcript(concat!(
            "event: agent_started\ndata: {}\n\n",
            "event: error\ndata: {\"message\":\"quota exceeded\"}\n\n",
        ));
        let mut out = Vec::new();
        let state = replay_into(file.path(), 64, &mut out).await.expect("replay");
        let text = String::from_utf8(out).expect("utf8");

        assert_eq!(state.phase(), RunPhase::Errored);
        assert!(text.contains("Status: Failed: quota exceeded"));
    }

    #[tokio::test]
    async fn missing_transcript_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = replay_into(&dir.path().join("absent.sse"), 64, Vec::new()).await;
        assert!(result.is_err());
    }
}
