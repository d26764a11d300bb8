use thiserror::Error;

/// Errors raised by the conversation pipeline.
///
/// None of these is fatal to a session: the controller recovers from each one
/// locally and the conversation stays usable.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// Submitted text was empty after trimming.
    #[error("message is empty")]
    Validation,

    /// Transport failure, timeout, non-success status or undecodable body.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A submission arrived while a response was still in flight.
    #[error("a response is already in progress")]
    ConcurrentSubmission,
}

impl ChatError {
    pub fn backend(reason: impl Into<String>) -> Self {
        ChatError::BackendUnavailable(reason.into())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::BackendUnavailable(err.to_string())
    }
}

pub type ChatResult<T> = std::result::Result<T, ChatError>;
