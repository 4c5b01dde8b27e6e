use thiserror::Error;

/// Errors that can occur against the checkpoint store, rate limiter, or
/// pub/sub channels — all backed by the same Redis deployment (§4.11).
#[derive(Debug, Error)]
pub enum StateError {
    /// No checkpoint exists for this conversation id.
    #[error("no checkpoint for conversation {conversation_id}")]
    NotFound { conversation_id: String },

    /// A Redis pool checkout failed.
    #[error("redis pool error: {0}")]
    Pool(#[from] deadpool_redis::PoolError),

    /// Building the pool itself failed (bad URL, unreachable at construction).
    #[error("redis pool creation failed: {0}")]
    PoolCreation(String),

    /// A Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The checkpoint value stored under a conversation key was not valid
    /// JSON, or did not match `ConversationState`'s shape.
    #[error("malformed checkpoint for conversation {conversation_id}: {source}")]
    Malformed {
        conversation_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StateError>;
