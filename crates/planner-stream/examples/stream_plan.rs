use std::sync::Arc;

use planner_stream::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), StreamError> {
    planner_telemetry::observability::init_observability();

    let client = PlanClient::builder()
        .transport(Arc::new(SseTransport::from_env()?))
        .build()?;

    let mut run = client.handle();
    run.start(RunParameters::new("demo-profile", "Rust").fast_mode(true))
        .await?;

    while let Some(event) = run.next_event().await {
        match event {
            RunEvent::ActionExecuted { action_name } => {
                println!("[{:>3}%] {action_name}", run.state().progress())
            }
            RunEvent::AgentCompleted { result } => {
                for (i, step) in result.curriculum.iter().enumerate() {
                    println!("{:>2}. {}", i + 1, step.name);
                }
            }
            RunEvent::Error { message } => eprintln!("run error: {message}"),
            RunEvent::AgentStarted | RunEvent::PlanningStarted | RunEvent::Progress { .. } => {}
        }
    }

    println!("{}", run.state().status_line());
    Ok(())
}
