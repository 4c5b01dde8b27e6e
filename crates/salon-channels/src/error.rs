use thiserror::Error;

/// Errors from the messaging gateway or calendar RPC clients (§6.3, §6.4).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The underlying HTTP transport failed (connect, TLS, timeout).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote service returned a non-2xx response.
    #[error("{dependency} returned {status}: {body}")]
    Api {
        dependency: &'static str,
        status: u16,
        body: String,
    },

    /// A response body did not match the expected shape.
    #[error("malformed response from {dependency}: {0}")]
    MalformedResponse(String, #[source] serde_json::Error),

    /// The client's own configuration (base URL, token) is invalid.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// An operation exceeded its allowed time budget (§5: 10s default).
    #[error("operation timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl ChannelError {
    /// Whether this error belongs to §7 category 2 ("transient external")
    /// and is worth retrying with backoff, as opposed to a permanent
    /// configuration mistake that retrying cannot fix.
    pub fn is_transient(&self) -> bool {
        match self {
            ChannelError::Transport(e) => !e.is_builder(),
            ChannelError::Api { status, .. } => *status >= 500,
            ChannelError::Timeout { .. } => true,
            ChannelError::MalformedResponse(..) | ChannelError::ConfigError(_) => false,
        }
    }
}
