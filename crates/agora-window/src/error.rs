use reqwest::StatusCode;

/// Failure talking to the message backend.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded with {0}")]
    Status(StatusCode),

    #[error("message source unavailable: {0}")]
    Unavailable(String),
}

/// Why a send did not go through. Validation variants are raised before any
/// request is made.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("no thread is open")]
    NoActiveThread,

    #[error("thread has not finished loading")]
    ThreadNotLoaded,

    #[error("message is empty")]
    EmptyContent,

    #[error("cannot determine the recipient of this thread")]
    UnresolvedRecipient,

    #[error("message was not sent: {0}")]
    Rejected(#[source] SourceError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("page sizes must be at least 1")]
    ZeroPageSize,

    #[error("poll interval must be non-zero")]
    ZeroPollInterval,

    #[error("bottom threshold must be a non-negative number, got {0}")]
    InvalidThreshold(f64),
}
