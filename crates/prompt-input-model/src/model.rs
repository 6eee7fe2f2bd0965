use prompt_input_protocol::buffer::TerminalBuffer;
use prompt_input_protocol::event::PromptInputEvent;
use prompt_input_protocol::ids::LineMarker;
use prompt_input_protocol::snapshot::{PromptInputSnapshot, SerializedPromptInput};
use prompt_input_protocol::state::{PromptInputState, ShellType};
use unicode_width::UnicodeWidthStr;

use crate::sync::SyncOutcome;
use crate::text::truncate_chars;
use crate::INTERRUPT_INPUT;

/// Prompt input reconstructed from the buffer of one terminal session.
///
/// The model never holds on to the buffer: every operation that needs it
/// borrows a [`TerminalBuffer`] for the duration of the call. Events are
/// queued in firing order and handed out by [`PromptInputModel::take_events`].
#[derive(Debug)]
pub struct PromptInputModel {
    pub(crate) state: PromptInputState,
    pub(crate) value: String,
    pub(crate) cursor_index: Option<usize>,
    pub(crate) ghost_text_index: Option<usize>,
    pub(crate) command_start_marker: Option<LineMarker>,
    pub(crate) command_start_x: usize,
    pub(crate) continuation_prompt: Option<String>,
    pub(crate) last_prompt_line: Option<String>,
    pub(crate) last_user_input: String,
    pub(crate) shell_type: Option<ShellType>,
    pending_events: Vec<PromptInputEvent>,
}

impl Default for PromptInputModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PromptInputModel {
    pub fn new() -> Self {
        Self {
            state: PromptInputState::Unknown,
            value: String::new(),
            cursor_index: Some(0),
            ghost_text_index: None,
            command_start_marker: None,
            command_start_x: 0,
            continuation_prompt: None,
            last_prompt_line: None,
            last_user_input: String::new(),
            shell_type: None,
            pending_events: Vec::new(),
        }
    }

    pub fn state(&self) -> PromptInputState {
        self.state
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor_index(&self) -> Option<usize> {
        self.cursor_index
    }

    pub fn ghost_text_index(&self) -> Option<usize> {
        self.ghost_text_index
    }

    pub fn command_start_x(&self) -> usize {
        self.command_start_x
    }

    pub fn continuation_prompt(&self) -> Option<&str> {
        self.continuation_prompt.as_deref()
    }

    pub fn last_prompt_line(&self) -> Option<&str> {
        self.last_prompt_line.as_deref()
    }

    pub fn shell_type(&self) -> Option<ShellType> {
        self.shell_type
    }

    pub fn last_user_input(&self) -> &str {
        &self.last_user_input
    }

    pub fn snapshot(&self) -> PromptInputSnapshot {
        PromptInputSnapshot::new(self.value.clone(), self.cursor_index, self.ghost_text_index)
    }

    pub fn prefix(&self) -> String {
        self.snapshot().prefix().to_owned()
    }

    pub fn suffix(&self) -> String {
        self.snapshot().suffix().to_owned()
    }

    pub fn combined_string(&self, empty_string_when_empty: bool) -> String {
        self.snapshot().combined_string(empty_string_when_empty)
    }

    /// Drains queued events in the order they fired.
    pub fn take_events(&mut self) -> Vec<PromptInputEvent> {
        std::mem::take(&mut self.pending_events)
    }

    /// A blank prompt clears the setting. Takes effect on the next sync.
    pub fn set_continuation_prompt(&mut self, prompt: Option<String>) {
        self.continuation_prompt = prompt.filter(|prompt| !prompt.trim().is_empty());
    }

    /// Takes effect on the next command start.
    pub fn set_last_prompt_line(&mut self, prompt_line: Option<String>) {
        self.last_prompt_line = prompt_line.filter(|prompt_line| !prompt_line.is_empty());
    }

    pub fn set_shell_type(&mut self, shell_type: Option<ShellType>) {
        self.shell_type = shell_type;
    }

    /// Raw data the user sent to the terminal, kept for disambiguation.
    pub fn record_user_input(&mut self, data: impl Into<String>) {
        self.last_user_input = data.into();
    }

    pub fn handle_command_start(&mut self, buffer: &dyn TerminalBuffer, marker: LineMarker) {
        if self.state == PromptInputState::Input {
            return;
        }

        self.state = PromptInputState::Input;
        self.command_start_marker = Some(marker);
        self.command_start_x = buffer.cursor_x();
        self.value.clear();
        self.cursor_index = Some(0);
        self.ghost_text_index = None;
        tracing::debug!(
            command_start_x = self.command_start_x,
            marker = marker.id(),
            "prompt input started"
        );

        let snapshot = self.snapshot();
        self.emit(PromptInputEvent::StartInput(snapshot.clone()));
        self.emit(PromptInputEvent::ChangeInput(snapshot));

        if let Some(prompt_start_x) = self.prompt_line_start_x(buffer, marker) {
            tracing::debug!(
                observed = self.command_start_x,
                corrected = prompt_start_x,
                "correcting command start column from prompt line"
            );
            self.command_start_x = prompt_start_x;
            self.sync(buffer);
        }
    }

    pub fn handle_command_start_changed(&mut self, buffer: &dyn TerminalBuffer) {
        if self.state != PromptInputState::Input {
            return;
        }

        self.command_start_x = buffer.cursor_x();
        tracing::debug!(
            command_start_x = self.command_start_x,
            "prompt input start column changed"
        );
        self.emit(PromptInputEvent::ChangeInput(self.snapshot()));
        self.sync(buffer);
    }

    pub fn handle_command_executed(&mut self) {
        if self.state == PromptInputState::Execute {
            return;
        }

        self.cursor_index = None;
        if let Some(ghost_text_index) = self.ghost_text_index.take() {
            truncate_chars(&mut self.value, ghost_text_index);
        }

        if self.last_user_input == INTERRUPT_INPUT {
            self.last_user_input.clear();
            self.emit(PromptInputEvent::Interrupt(self.snapshot()));
        }

        self.state = PromptInputState::Execute;
        tracing::debug!(value = %self.value, "prompt input finished");
        let snapshot = self.snapshot();
        self.emit(PromptInputEvent::FinishInput(snapshot.clone()));
        self.emit(PromptInputEvent::ChangeInput(snapshot));
    }

    /// Replaces the value with a command line reported by a trusted source.
    pub fn set_confident_command_line(&mut self, value: impl Into<String>) {
        let value = value.into();
        if self.value == value {
            return;
        }

        self.value = value;
        self.cursor_index = None;
        self.ghost_text_index = None;
        self.emit(PromptInputEvent::ChangeInput(self.snapshot()));
    }

    /// Runs a reconciliation pass. Failures keep the previous snapshot.
    pub fn sync(&mut self, buffer: &dyn TerminalBuffer) {
        if self.state != PromptInputState::Input {
            return;
        }

        match self.reconcile(buffer) {
            Ok(Some(outcome)) => self.commit(outcome),
            Ok(None) => {}
            Err(error) => tracing::error!(error = %error, "prompt input sync failed"),
        }
    }

    pub fn serialize(&self) -> SerializedPromptInput {
        SerializedPromptInput {
            snapshot: self.snapshot(),
            command_start_x: self.command_start_x,
            last_prompt_line: self.last_prompt_line.clone(),
            continuation_prompt: self.continuation_prompt.clone(),
            last_user_input: self.last_user_input.clone(),
        }
    }

    /// Restores fields without reading any buffer. The next command start or
    /// sync reconciles whatever drifted in between.
    pub fn deserialize(&mut self, serialized: SerializedPromptInput) {
        self.value = serialized.snapshot.value;
        self.cursor_index = serialized.snapshot.cursor_index;
        self.ghost_text_index = serialized.snapshot.ghost_text_index;
        self.command_start_x = serialized.command_start_x;
        self.last_prompt_line = serialized.last_prompt_line;
        self.continuation_prompt = serialized.continuation_prompt;
        self.last_user_input = serialized.last_user_input;
    }

    fn commit(&mut self, outcome: SyncOutcome) {
        if outcome.consumed_user_input {
            self.last_user_input.clear();
        }

        let cursor_index = Some(outcome.cursor_index);
        if self.value == outcome.value
            && self.cursor_index == cursor_index
            && self.ghost_text_index == outcome.ghost_text_index
        {
            return;
        }

        self.value = outcome.value;
        self.cursor_index = cursor_index;
        self.ghost_text_index = outcome.ghost_text_index;
        let snapshot = self.snapshot();
        tracing::trace!(input = %snapshot.combined_string(false), "prompt input changed");
        self.emit(PromptInputEvent::ChangeInput(snapshot));
    }

    fn prompt_line_start_x(&self, buffer: &dyn TerminalBuffer, marker: LineMarker) -> Option<usize> {
        let prompt_line = self.last_prompt_line.as_deref()?;
        let width = UnicodeWidthStr::width(prompt_line);
        if width == self.command_start_x {
            return None;
        }

        // The prompt may not be drawn yet, so only the start row has to exist.
        let row = buffer.marker_line(marker)?;
        buffer.line(row).map(|_| width)
    }

    fn emit(&mut self, event: PromptInputEvent) {
        self.pending_events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use prompt_input_protocol::event::{PromptInputEvent, PromptInputEventKind};
    use prompt_input_protocol::grid::GridBuffer;
    use prompt_input_protocol::snapshot::{PromptInputSnapshot, SerializedPromptInput};
    use prompt_input_protocol::state::PromptInputState;

    use super::PromptInputModel;
    use crate::test_support::{assert_prompt_input, event_kinds, TerminalFixture};

    #[test]
    fn basic_input_and_execute() {
        let mut term = TerminalFixture::new(80, 10);
        let mut model = PromptInputModel::new();

        term.write("$ ");
        term.command_start(&mut model);
        assert_prompt_input(&model, "|");

        term.write("foo bar");
        model.sync(term.buffer());
        assert_prompt_input(&model, "foo bar|");

        term.write("\r\n");
        model.handle_command_executed();
        assert_prompt_input(&model, "foo bar");
        assert_eq!(model.state(), PromptInputState::Execute);

        term.write("(command output)\r\n$ ");
        term.command_start(&mut model);
        assert_prompt_input(&model, "|");
        assert_eq!(model.command_start_x(), 2);
    }

    #[test]
    fn command_start_fires_start_then_change() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();

        term.write("$ ");
        term.command_start(&mut model);

        assert_eq!(
            event_kinds(&model.take_events()),
            vec![PromptInputEventKind::StartInput, PromptInputEventKind::ChangeInput]
        );
    }

    #[test]
    fn repeated_transitions_do_not_refire_events() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();

        term.write("$ ");
        term.command_start(&mut model);
        model.take_events();
        term.command_start(&mut model);
        assert!(model.take_events().is_empty());

        model.handle_command_executed();
        model.take_events();
        model.handle_command_executed();
        assert!(model.take_events().is_empty());
    }

    #[test]
    fn execute_from_unknown_is_allowed() {
        let mut model = PromptInputModel::new();

        model.handle_command_executed();

        assert_eq!(model.state(), PromptInputState::Execute);
        assert_eq!(model.cursor_index(), None);
        assert_eq!(
            event_kinds(&model.take_events()),
            vec![PromptInputEventKind::FinishInput, PromptInputEventKind::ChangeInput]
        );
    }

    #[test]
    fn identical_syncs_do_not_fire_change_events() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();
        term.write("$ ");
        term.command_start(&mut model);
        term.write("foo");
        model.sync(term.buffer());
        model.take_events();

        model.sync(term.buffer());
        model.sync(term.buffer());

        assert!(model.take_events().is_empty());
        assert_prompt_input(&model, "foo|");
    }

    #[test]
    fn adjacent_change_events_always_differ() {
        let mut term = TerminalFixture::new(80, 6);
        let mut model = PromptInputModel::new();

        term.write("$ ");
        term.command_start(&mut model);
        for chunk in ["foo", " bar"] {
            term.write(chunk);
            model.sync(term.buffer());
            model.sync(term.buffer());
        }
        term.write("\r\n");
        model.handle_command_executed();
        term.write("$ ");
        term.command_start(&mut model);
        term.write("foo bar");
        model.sync(term.buffer());

        let changes = model
            .take_events()
            .into_iter()
            .filter(|event| matches!(event, PromptInputEvent::ChangeInput(_)))
            .map(|event| event.snapshot().clone())
            .collect::<Vec<_>>();
        assert!(changes.len() >= 5);
        for pair in changes.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }

    #[test]
    fn ctrl_c_fires_interrupt_before_finish() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();
        term.write("$ ");
        term.command_start(&mut model);
        term.write("foo");
        model.sync(term.buffer());
        model.take_events();

        model.record_user_input("\u{3}");
        term.write("^C");
        model.handle_command_executed();

        assert_eq!(
            event_kinds(&model.take_events()),
            vec![
                PromptInputEventKind::Interrupt,
                PromptInputEventKind::FinishInput,
                PromptInputEventKind::ChangeInput,
            ]
        );
        assert_eq!(model.last_user_input(), "");
    }

    #[test]
    fn execute_drops_ghost_text_and_cursor() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();
        term.write("$ ");
        term.command_start(&mut model);
        term.write("gi").dim("t status").left(8);
        model.sync(term.buffer());
        assert_prompt_input(&model, "gi|[t status]");

        model.handle_command_executed();

        assert_eq!(model.value(), "gi");
        assert_eq!(model.cursor_index(), None);
        assert_eq!(model.ghost_text_index(), None);
    }

    #[test]
    fn sync_is_ignored_outside_input() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();
        term.write("$ ");
        term.command_start(&mut model);
        term.write("ls");
        model.sync(term.buffer());
        model.handle_command_executed();
        model.take_events();

        term.write(" -la");
        model.sync(term.buffer());

        assert_eq!(model.value(), "ls");
        assert!(model.take_events().is_empty());
    }

    #[test]
    fn command_start_changed_rereads_start_column() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();
        term.write("$ ");
        term.command_start(&mut model);
        term.write("(main) $ ");
        model.handle_command_start_changed(term.buffer());
        model.take_events();

        term.write("git");
        model.sync(term.buffer());

        assert_eq!(model.command_start_x(), 11);
        assert_prompt_input(&model, "git|");
    }

    #[test]
    fn command_start_changed_is_ignored_outside_input() {
        let term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();

        model.handle_command_start_changed(term.buffer());

        assert_eq!(model.command_start_x(), 0);
        assert!(model.take_events().is_empty());
    }

    #[test]
    fn last_prompt_line_corrects_start_column() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();
        model.set_last_prompt_line(Some("user@host:~$ ".to_owned()));
        term.write("user@host:~$ ls");

        term.command_start(&mut model);

        assert_eq!(model.command_start_x(), 13);
        assert_prompt_input(&model, "ls|");
    }

    #[test]
    fn last_prompt_line_corrects_start_before_prompt_is_drawn() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();
        model.set_last_prompt_line(Some("PS> ".to_owned()));

        term.command_start(&mut model);
        assert_eq!(model.command_start_x(), 4);

        term.write("PS> ls");
        model.sync(term.buffer());
        assert_prompt_input(&model, "ls|");
    }

    #[test]
    fn last_prompt_line_is_skipped_when_start_row_does_not_resolve() {
        let buffer = GridBuffer::new(80, 4);
        let detached = GridBuffer::new(80, 4).register_marker();
        let mut model = PromptInputModel::new();
        model.set_last_prompt_line(Some("PS> ".to_owned()));

        model.handle_command_start(&buffer, detached);

        assert_eq!(model.command_start_x(), 0);
        assert_eq!(model.state(), PromptInputState::Input);
    }

    #[test]
    fn confident_command_line_overrides_value() {
        let mut model = PromptInputModel::new();

        model.set_confident_command_line("git push");
        assert_eq!(model.snapshot(), PromptInputSnapshot::new("git push", None, None));
        assert_eq!(model.take_events().len(), 1);

        model.set_confident_command_line("git push");
        assert!(model.take_events().is_empty());
    }

    #[test]
    fn blank_settings_are_treated_as_unset() {
        let mut model = PromptInputModel::new();

        model.set_continuation_prompt(Some("  ".to_owned()));
        model.set_last_prompt_line(Some(String::new()));

        assert_eq!(model.continuation_prompt(), None);
        assert_eq!(model.last_prompt_line(), None);
    }

    #[test]
    fn serialize_round_trip_restores_snapshot_without_buffer() {
        let mut term = TerminalFixture::new(80, 4);
        let mut model = PromptInputModel::new();
        model.set_continuation_prompt(Some("> ".to_owned()));
        term.write("$ ");
        term.command_start(&mut model);
        term.write("foo").dim(" bar").left(4);
        model.sync(term.buffer());
        model.record_user_input("x");

        let serialized = model.serialize();
        let json = serde_json::to_string(&serialized).expect("serialize prompt input");
        let parsed: SerializedPromptInput =
            serde_json::from_str(&json).expect("deserialize prompt input");
        let mut restored = PromptInputModel::new();
        restored.deserialize(parsed);

        assert_eq!(restored.snapshot(), model.snapshot());
        assert_eq!(restored.command_start_x(), 2);
        assert_eq!(restored.continuation_prompt(), Some("> "));
        assert_eq!(restored.last_user_input(), "x");
        assert_eq!(restored.prefix(), "foo");
        assert_eq!(restored.suffix(), "");
        assert!(restored.take_events().is_empty());
    }
}
