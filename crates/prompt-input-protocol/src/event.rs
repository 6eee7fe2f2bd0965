use serde::{Deserialize, Serialize};

use crate::snapshot::PromptInputSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PromptInputEventKind {
    StartInput,
    ChangeInput,
    FinishInput,
    Interrupt,
}

/// Every observable change carries the snapshot taken when it fired.
///
/// `ChangeInput` follows every other kind so observers can listen on one
/// channel only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptInputEvent {
    StartInput(PromptInputSnapshot),
    ChangeInput(PromptInputSnapshot),
    FinishInput(PromptInputSnapshot),
    Interrupt(PromptInputSnapshot),
}

impl PromptInputEvent {
    pub fn kind(&self) -> PromptInputEventKind {
        match self {
            Self::StartInput(_) => PromptInputEventKind::StartInput,
            Self::ChangeInput(_) => PromptInputEventKind::ChangeInput,
            Self::FinishInput(_) => PromptInputEventKind::FinishInput,
            Self::Interrupt(_) => PromptInputEventKind::Interrupt,
        }
    }

    pub fn snapshot(&self) -> &PromptInputSnapshot {
        match self {
            Self::StartInput(snapshot)
            | Self::ChangeInput(snapshot)
            | Self::FinishInput(snapshot)
            | Self::Interrupt(snapshot) => snapshot,
        }
    }
}
