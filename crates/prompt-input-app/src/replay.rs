use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use prompt_input_eventbus::PromptInputEventEnvelope;
use prompt_input_protocol::event::PromptInputEventKind;
use prompt_input_protocol::snapshot::PromptInputSnapshot;
use prompt_input_protocol::state::ShellType;
use prompt_input_runtime::PromptInputSessionHandle;
use serde::{Deserialize, Serialize};

/// One line of a recorded session.
///
/// ```text
/// {"op":"write","data":"$ "}
/// {"op":"command_start"}
/// {"op":"input","data":"l"}
/// {"op":"write","data":"l"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ReplayOp {
    /// Terminal output.
    Write { data: String },
    /// Raw data the user typed.
    Input { data: String },
    CommandStart,
    CommandStartChanged,
    CommandExecuted,
    ContinuationPrompt {
        #[serde(default)]
        value: Option<String>,
    },
    PromptLine {
        #[serde(default)]
        value: Option<String>,
    },
    ShellType {
        #[serde(default)]
        value: Option<String>,
    },
    ConfidentCommandLine { value: String },
    Resize { cols: u16, rows: u16 },
    /// Pause between ops so throttled syncs fire as they did live.
    Sleep { ms: u64 },
}

/// Parses JSON lines. Blank lines and lines starting with `#` are skipped.
pub fn parse_recording(text: &str) -> Result<Vec<ReplayOp>> {
    text.lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
        .map(|(line_number, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid replay op on line {line_number}"))
        })
        .collect()
}

pub async fn replay(session: &PromptInputSessionHandle, ops: &[ReplayOp]) -> Result<()> {
    for op in ops {
        apply(session, op).await?;
    }
    Ok(())
}

async fn apply(session: &PromptInputSessionHandle, op: &ReplayOp) -> Result<()> {
    match op {
        ReplayOp::Write { data } => session.write(data.as_bytes()).await?,
        ReplayOp::Input { data } => session.user_input(data.as_str()).await?,
        ReplayOp::CommandStart => session.command_start().await?,
        ReplayOp::CommandStartChanged => session.command_start_changed().await?,
        ReplayOp::CommandExecuted => session.command_executed().await?,
        ReplayOp::ContinuationPrompt { value } => {
            session.set_continuation_prompt(value.clone()).await?;
        }
        ReplayOp::PromptLine { value } => session.set_last_prompt_line(value.clone()).await?,
        ReplayOp::ShellType { value } => {
            let shell_type = value
                .as_deref()
                .map(|name| {
                    ShellType::parse(name).ok_or_else(|| anyhow!("unknown shell type '{name}'"))
                })
                .transpose()?;
            session.set_shell_type(shell_type).await?;
        }
        ReplayOp::ConfidentCommandLine { value } => {
            session.set_confident_command_line(value.as_str()).await?;
        }
        ReplayOp::Resize { cols, rows } => session.resize(*cols, *rows).await?,
        ReplayOp::Sleep { ms } => tokio::time::sleep(Duration::from_millis(*ms)).await,
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct PrintedEvent<'a> {
    session_id: &'a str,
    sequence: u64,
    kind: PromptInputEventKind,
    input: String,
    snapshot: &'a PromptInputSnapshot,
}

/// Renders an event as one JSON line.
pub fn format_event(envelope: &PromptInputEventEnvelope) -> serde_json::Result<String> {
    let snapshot = envelope.event.snapshot();
    serde_json::to_string(&PrintedEvent {
        session_id: envelope.session_id.as_str(),
        sequence: envelope.sequence,
        kind: envelope.event.kind(),
        input: snapshot.combined_string(false),
        snapshot,
    })
}
