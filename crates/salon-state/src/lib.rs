//! The State Store (C1, spec.md §4.11): a Redis-backed checkpoint store
//! keyed by conversation id, a fixed-window rate limiter, a per-conversation
//! distributed lock enforcing §5's serialization guarantee, and the
//! `incoming_messages`/`outgoing_messages` pub/sub channels (§4.12).

pub mod error;
pub mod lock;
pub mod manager;
pub mod pubsub;
pub mod rate_limit;
pub mod types;

pub use error::StateError;
pub use lock::ConversationLock;
pub use manager::CheckpointStore;
pub use pubsub::PubSubClient;
pub use rate_limit::RateLimiter;
pub use types::{ConversationState, Message, MessageRole};
