use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Instant;

use prompt_input_config::PromptInputConfig;
use prompt_input_eventbus::{
    PromptInputEnvelopeSubscription, PromptInputEventBus, PromptInputEventEnvelope,
};
use prompt_input_model::PromptInputModel;
use prompt_input_protocol::error::{PromptInputError, PromptInputResult};
use prompt_input_protocol::ids::{LineMarker, PromptSessionId};
use prompt_input_protocol::snapshot::{PromptInputSnapshot, SerializedPromptInput};
use prompt_input_protocol::state::{PromptInputState, ShellType};
use prompt_input_scheduler::{SyncDecision, SyncThrottle};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::terminal_emulator::TerminalEmulator;

enum SessionCommand {
    Write(Vec<u8>),
    UserInput(String),
    CommandStart,
    CommandStartChanged,
    CommandExecuted,
    SetContinuationPrompt(Option<String>),
    SetLastPromptLine(Option<String>),
    SetShellType(Option<ShellType>),
    SetConfidentCommandLine(String),
    Resize {
        cols: u16,
        rows: u16,
        reply: oneshot::Sender<PromptInputResult<()>>,
    },
    Snapshot(oneshot::Sender<PromptInputSnapshot>),
    State(oneshot::Sender<PromptInputState>),
    Serialize(oneshot::Sender<SerializedPromptInput>),
    Deserialize(SerializedPromptInput),
    Shutdown(oneshot::Sender<()>),
}

/// Single-writer actor owning one terminal emulator and its prompt input model.
pub struct PromptInputSession;

impl PromptInputSession {
    /// Starts the actor on the current tokio runtime.
    pub fn spawn(
        config: &PromptInputConfig,
        bus: Arc<PromptInputEventBus>,
        session_id: PromptSessionId,
    ) -> PromptInputResult<PromptInputSessionHandle> {
        let emulator = TerminalEmulator::new(
            config.terminal.cols,
            config.terminal.rows,
            config.terminal.scrollback_limit,
            config.terminal.scrollback_window_rows,
        )?;

        let mut model = PromptInputModel::new();
        model.set_shell_type(config.shell_type());
        model.set_continuation_prompt(config.shell.continuation_prompt.clone());
        model.set_last_prompt_line(config.shell.last_prompt_line.clone());

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let actor = SessionActor {
            session_id: session_id.clone(),
            bus: Arc::clone(&bus),
            emulator,
            model,
            throttle: SyncThrottle::new(config.sync_interval()),
            command_start_marker: None,
            sync_wanted: false,
        };
        tokio::spawn(actor.run(commands_rx));

        Ok(PromptInputSessionHandle {
            session_id,
            bus,
            commands: commands_tx,
        })
    }
}

/// Cloneable front end of a running [`PromptInputSession`].
///
/// Commands are applied in the order they are sent. Queries and shell
/// integration signals observe every command sent before them, including a
/// sync the throttle was still holding.
#[derive(Clone)]
pub struct PromptInputSessionHandle {
    session_id: PromptSessionId,
    bus: Arc<PromptInputEventBus>,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl PromptInputSessionHandle {
    pub fn session_id(&self) -> &PromptSessionId {
        &self.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PromptInputEventEnvelope> {
        self.bus.subscribe_session(self.session_id.clone())
    }

    pub fn event_stream(&self) -> PromptInputEnvelopeSubscription {
        self.bus.session_stream(self.session_id.clone())
    }

    /// Terminal output, fed to the emulator.
    pub async fn write(&self, bytes: impl Into<Vec<u8>>) -> PromptInputResult<()> {
        self.send(SessionCommand::Write(bytes.into()))
    }

    /// Raw data the user typed.
    pub async fn user_input(&self, data: impl Into<String>) -> PromptInputResult<()> {
        self.send(SessionCommand::UserInput(data.into()))
    }

    /// The prompt finished rendering; input starts at the cursor.
    pub async fn command_start(&self) -> PromptInputResult<()> {
        self.send(SessionCommand::CommandStart)
    }

    pub async fn command_start_changed(&self) -> PromptInputResult<()> {
        self.send(SessionCommand::CommandStartChanged)
    }

    pub async fn command_executed(&self) -> PromptInputResult<()> {
        self.send(SessionCommand::CommandExecuted)
    }

    pub async fn set_continuation_prompt(&self, prompt: Option<String>) -> PromptInputResult<()> {
        self.send(SessionCommand::SetContinuationPrompt(prompt))
    }

    pub async fn set_last_prompt_line(&self, prompt_line: Option<String>) -> PromptInputResult<()> {
        self.send(SessionCommand::SetLastPromptLine(prompt_line))
    }

    pub async fn set_shell_type(&self, shell_type: Option<ShellType>) -> PromptInputResult<()> {
        self.send(SessionCommand::SetShellType(shell_type))
    }

    pub async fn set_confident_command_line(
        &self,
        value: impl Into<String>,
    ) -> PromptInputResult<()> {
        self.send(SessionCommand::SetConfidentCommandLine(value.into()))
    }

    pub async fn resize(&self, cols: u16, rows: u16) -> PromptInputResult<()> {
        if cols == 0 || rows == 0 {
            return Err(PromptInputError::Configuration(
                "prompt input session resize requires non-zero rows and columns".to_owned(),
            ));
        }
        self.request(|reply| SessionCommand::Resize { cols, rows, reply })
            .await?
    }

    pub async fn snapshot(&self) -> PromptInputResult<PromptInputSnapshot> {
        self.request(SessionCommand::Snapshot).await
    }

    pub async fn state(&self) -> PromptInputResult<PromptInputState> {
        self.request(SessionCommand::State).await
    }

    pub async fn serialize(&self) -> PromptInputResult<SerializedPromptInput> {
        self.request(SessionCommand::Serialize).await
    }

    pub async fn deserialize(&self, serialized: SerializedPromptInput) -> PromptInputResult<()> {
        self.send(SessionCommand::Deserialize(serialized))
    }

    /// Stops the actor once every earlier command has been applied.
    pub async fn shutdown(&self) -> PromptInputResult<()> {
        self.request(SessionCommand::Shutdown).await
    }

    fn send(&self, command: SessionCommand) -> PromptInputResult<()> {
        self.commands.send(command).map_err(|_| self.closed())
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SessionCommand,
    ) -> PromptInputResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(command(reply_tx))?;
        reply_rx.await.map_err(|_| self.closed())
    }

    fn closed(&self) -> PromptInputError {
        PromptInputError::SessionClosed(format!(
            "prompt input session {} is no longer running",
            self.session_id
        ))
    }
}

struct SessionActor {
    session_id: PromptSessionId,
    bus: Arc<PromptInputEventBus>,
    emulator: TerminalEmulator,
    model: PromptInputModel,
    throttle: SyncThrottle,
    command_start_marker: Option<LineMarker>,
    sync_wanted: bool,
}

impl SessionActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        tracing::debug!(session_id = %self.session_id, "prompt input session started");
        loop {
            let command = match self.throttle.deadline() {
                Some(deadline) => {
                    tokio::select! {
                        command = commands.recv() => command,
                        () = tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)) => {
                            if self.throttle.flush(Instant::now()) {
                                self.run_sync();
                            }
                            continue;
                        }
                    }
                }
                None => commands.recv().await,
            };
            let Some(command) = command else {
                break;
            };

            // Everything already queued belongs to the same tick and shares
            // one sync request.
            if self.handle(command).is_break() {
                break;
            }
            let mut stopped = false;
            while let Ok(command) = commands.try_recv() {
                if self.handle(command).is_break() {
                    stopped = true;
                    break;
                }
            }
            if stopped {
                break;
            }
            self.schedule_sync();
        }
        tracing::debug!(session_id = %self.session_id, "prompt input session stopped");
    }

    fn handle(&mut self, command: SessionCommand) -> ControlFlow<()> {
        match command {
            SessionCommand::Write(bytes) => {
                self.emulator.process(&bytes);
                self.sync_wanted = true;
            }
            // Only kept for disambiguation; the echo that follows drives the sync.
            SessionCommand::UserInput(data) => self.model.record_user_input(data),
            SessionCommand::CommandStart => {
                self.flush_sync();
                self.command_start();
            }
            SessionCommand::CommandStartChanged => {
                self.flush_sync();
                let grid = self.emulator.grid();
                self.model.handle_command_start_changed(&grid);
            }
            SessionCommand::CommandExecuted => {
                self.flush_sync();
                self.model.handle_command_executed();
            }
            SessionCommand::SetContinuationPrompt(prompt) => {
                self.model.set_continuation_prompt(prompt);
                self.sync_wanted = true;
            }
            SessionCommand::SetLastPromptLine(prompt_line) => {
                self.model.set_last_prompt_line(prompt_line);
            }
            SessionCommand::SetShellType(shell_type) => {
                self.model.set_shell_type(shell_type);
                self.sync_wanted = true;
            }
            SessionCommand::SetConfidentCommandLine(value) => {
                self.model.set_confident_command_line(value);
            }
            SessionCommand::Resize { cols, rows, reply } => {
                let result = self.emulator.resize(cols, rows);
                if let Err(error) = &result {
                    tracing::warn!(session_id = %self.session_id, error = %error, "prompt input session resize rejected");
                } else {
                    self.sync_wanted = true;
                }
                let _ = reply.send(result);
            }
            SessionCommand::Snapshot(reply) => {
                self.flush_sync();
                let _ = reply.send(self.model.snapshot());
            }
            SessionCommand::State(reply) => {
                self.flush_sync();
                let _ = reply.send(self.model.state());
            }
            SessionCommand::Serialize(reply) => {
                self.flush_sync();
                let _ = reply.send(self.model.serialize());
            }
            SessionCommand::Deserialize(serialized) => self.model.deserialize(serialized),
            SessionCommand::Shutdown(reply) => {
                self.flush_sync();
                let _ = reply.send(());
                return ControlFlow::Break(());
            }
        }
        self.publish_events();
        ControlFlow::Continue(())
    }

    fn command_start(&mut self) {
        if self.model.state().is_input() {
            tracing::trace!(session_id = %self.session_id, "command start ignored while input is active");
            return;
        }

        let marker = self.emulator.register_marker();
        if let Some(previous) = self.command_start_marker.replace(marker) {
            self.emulator.forget_marker(previous);
        }
        let grid = self.emulator.grid();
        self.model.handle_command_start(&grid, marker);
        self.sync_wanted = true;
    }

    fn schedule_sync(&mut self) {
        if !std::mem::take(&mut self.sync_wanted) {
            return;
        }
        match self.throttle.request(Instant::now()) {
            SyncDecision::RunNow => self.run_sync(),
            SyncDecision::Scheduled(deadline) => {
                tracing::trace!(session_id = %self.session_id, ?deadline, "prompt input sync deferred");
            }
        }
    }

    /// Runs any sync that is wanted or held back by the throttle.
    fn flush_sync(&mut self) {
        let wanted = std::mem::take(&mut self.sync_wanted);
        let pending = self.throttle.flush(Instant::now());
        if wanted || pending {
            self.run_sync();
        }
    }

    fn run_sync(&mut self) {
        if !self.model.state().is_input() {
            return;
        }
        let grid = self.emulator.grid();
        self.model.sync(&grid);
        self.publish_events();
    }

    fn publish_events(&mut self) {
        let events = self.model.take_events();
        if events.is_empty() {
            return;
        }
        for envelope in self.bus.publish_all(&self.session_id, events) {
            tracing::trace!(
                session_id = %self.session_id,
                sequence = envelope.sequence,
                kind = ?envelope.event.kind(),
                input = %envelope.event.snapshot().combined_string(false),
                "prompt input event published"
            );
        }
    }
}
