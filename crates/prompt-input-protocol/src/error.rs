use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PromptInputError {
    #[error("prompt input configuration error: {0}")]
    Configuration(String),
    #[error("prompt input buffer error: {0}")]
    Buffer(String),
    #[error("prompt input session closed: {0}")]
    SessionClosed(String),
    #[error("prompt input internal error: {0}")]
    Internal(String),
}

pub type PromptInputResult<T> = Result<T, PromptInputError>;
