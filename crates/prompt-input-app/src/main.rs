use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use prompt_input_app::{
    format_event, init_logging, parse_cli_flags, parse_recording, print_cli_help, replay,
};
use prompt_input_eventbus::PromptInputEventBus;
use prompt_input_protocol::ids::PromptSessionId;
use prompt_input_runtime::PromptInputSession;

const DEFAULT_SESSION_ID: &str = "replay";
const REPLAY_EVENT_BUFFER: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli_flags(std::env::args().skip(1))?;
    if cli.help {
        print_cli_help();
        return Ok(());
    }

    let mut config = match cli.config_path.as_deref() {
        Some(path) => prompt_input_config::load_from_path(path)?,
        None => prompt_input_config::load_from_env()?,
    };
    if let Some(shell) = cli.shell {
        config.shell.shell_type = Some(shell.as_str().to_owned());
    }
    init_logging(&config.logging)?;

    let recording = read_recording(cli.recording.as_deref())?;
    let ops = parse_recording(&recording)?;

    let bus = Arc::new(PromptInputEventBus::with_capacity(REPLAY_EVENT_BUFFER));
    let session_id =
        PromptSessionId::new(cli.session_id.unwrap_or_else(|| DEFAULT_SESSION_ID.to_owned()));
    let mut events = bus.session_stream(session_id.clone());
    let printer = tokio::spawn(async move {
        while let Some(envelope) = events.next_envelope().await {
            match format_event(&envelope) {
                Ok(line) => println!("{line}"),
                Err(error) => {
                    tracing::warn!(error = %error, "failed to format prompt input event");
                }
            }
        }
    });

    let session = PromptInputSession::spawn(&config, Arc::clone(&bus), session_id.clone())?;
    tracing::info!(session_id = %session_id, ops = ops.len(), "replaying recorded session");
    let replayed = replay(&session, &ops).await;
    if let Err(error) = &replayed {
        tracing::warn!(session_id = %session_id, error = %error, "replay stopped early");
    }

    session.shutdown().await?;
    // Dropping the session sender ends the printer once it has drained.
    bus.remove_session(&session_id);
    printer.await.context("event printer task failed")?;
    replayed
}

fn read_recording(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read recording '{}'", path.display())),
        None => {
            let mut recording = String::new();
            std::io::stdin()
                .read_to_string(&mut recording)
                .context("failed to read recording from stdin")?;
            Ok(recording)
        }
    }
}
