use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::{debug, instrument, warn};

use salon_core::config::CHECKPOINT_TTL_SECS;
use salon_core::types::ConversationId;

use crate::error::{Result, StateError};
use crate::types::ConversationState;

fn checkpoint_key(id: &ConversationId) -> String {
    format!("checkpoint:{}", id.as_str())
}

/// Thread-safe manager for checkpointed conversation state (C1, §4.11).
///
/// Wraps a `deadpool_redis::Pool` — cheap to clone, safe to share across
/// every inbound-worker task. Per-conversation serialization (§5) is not
/// enforced here; callers must hold the conversation's lock (see
/// [`crate::lock::ConversationLock`]) around the read-modify-write.
#[derive(Clone)]
pub struct CheckpointStore {
    pool: Pool,
}

impl CheckpointStore {
    pub fn new(redis_url: &str) -> Result<Self> {
        let cfg = Config::from_url(redis_url);
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| StateError::PoolCreation(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Expose the underlying pool so sibling stores ([`crate::rate_limit::RateLimiter`],
    /// [`crate::lock::ConversationLock`]) can share the one Redis deployment.
    pub fn pool(&self) -> Pool {
        self.pool.clone()
    }

    /// Retrieve the checkpoint for `id`, or `None` if no entry (or an
    /// expired one) exists.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub async fn get(&self, id: &ConversationId) -> Result<Option<ConversationState>> {
        let mut conn = self.pool.get().await?;
        let raw: Option<String> = conn.get(checkpoint_key(id)).await?;
        match raw {
            None => Ok(None),
            Some(raw) => match serde_json::from_str::<ConversationState>(&raw) {
                Ok(state) => Ok(Some(state)),
                Err(source) => {
                    warn!(error = %source, "checkpoint malformed, treating as absent");
                    Err(StateError::Malformed {
                        conversation_id: id.as_str().to_string(),
                        source,
                    })
                }
            },
        }
    }

    /// Load the checkpoint, or a fresh one seeded with `customer_phone` if
    /// none exists yet — the orchestrator's step 2 fallback (§4.1).
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub async fn get_or_create(&self, id: &ConversationId, customer_phone: &str) -> Result<ConversationState> {
        match self.get(id).await {
            Ok(Some(state)) => Ok(state),
            Ok(None) => Ok(ConversationState::new(customer_phone)),
            Err(StateError::Malformed { .. }) => Ok(ConversationState::new(customer_phone)),
            Err(e) => Err(e),
        }
    }

    /// Write `state` back, refreshing the TTL (§4.11: "every `put` refreshes
    /// the TTL").
    #[instrument(skip(self, state), fields(conversation_id = %id))]
    pub async fn put(&self, id: &ConversationId, state: &ConversationState) -> Result<()> {
        let raw = serde_json::to_string(state)?;
        let mut conn = self.pool.get().await?;
        let _: () = conn
            .set_ex(checkpoint_key(id), raw, CHECKPOINT_TTL_SECS)
            .await?;
        debug!("checkpoint written");
        Ok(())
    }

    /// Refresh the TTL without rewriting the value — used by long-running
    /// turns that want to avoid an inactivity eviction mid-flight.
    #[instrument(skip(self), fields(conversation_id = %id))]
    pub async fn touch(&self, id: &ConversationId) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let existed: bool = conn.expire(checkpoint_key(id), CHECKPOINT_TTL_SECS as i64).await?;
        if !existed {
            return Err(StateError::NotFound {
                conversation_id: id.as_str().to_string(),
            });
        }
        Ok(())
    }
}
