use thiserror::Error;

/// Errors raised by the progress engine.
///
/// Every engine computation is total over valid input, so the only failures
/// are caller mistakes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProgressError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Lesson session already finished")]
    SessionFinished,
}

impl ProgressError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
