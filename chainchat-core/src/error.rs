use thiserror::Error;

/// Core error type for chainchat.
/// Internally, modules can use `anyhow::Result<T>` for convenience,
/// but public boundaries should expose `CoreResult<T>` with this error.
///
/// Every variant is terminal for the call that produced it; retrying is
/// the caller's decision.
#[derive(Debug, Error)]
pub enum ChainChatError {
    #[error("validation failed: {0}")]
    Validation(String),

    /// Network failure before or during streaming.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The service answered with a non-success status; no frames were parsed.
    #[error("chat service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// A frame payload did not match the shape its label promises.
    #[error("could not decode `{event}` payload: {source}")]
    Decode {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    /// The stream closed without ever delivering a result frame.
    #[error("stream ended without a result frame")]
    Incomplete,

    /// Buffered text grew past the configured cap without a frame separator.
    #[error("frame exceeded the {limit}-byte buffer cap")]
    FrameTooLarge { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CoreResult<T> = std::result::Result<T, ChainChatError>;
