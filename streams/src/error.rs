use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("stream name must not be empty")]
    EmptyStreamName,
    #[error("stream '{stream}' declares a message without a name")]
    EmptyMessageName { stream: String },
    #[error("stream '{stream}' declares message '{message}' more than once")]
    DuplicateMessage { stream: String, message: String },
    #[error("cascade limit must be at least 1")]
    InvalidCascadeLimit,
    #[error("stream '{stream}' dropped {dropped} message(s) after reaching its cascade limit of {limit}")]
    CascadeOverflow {
        stream: String,
        limit: usize,
        dropped: usize,
    },
}
