use std::time::Duration;

use deadpool_redis::Pool;
use redis::AsyncCommands;
use tokio::time::sleep;
use tracing::{instrument, warn};
use uuid::Uuid;

use salon_core::types::ConversationId;

use crate::error::Result;

const LOCK_TTL_MS: usize = 15_000;
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_INTERVAL: Duration = Duration::from_millis(50);

fn lock_key(id: &ConversationId) -> String {
    format!("lock:conversation:{}", id.as_str())
}

/// A held per-conversation lock (§5: "a single conversation id must be
/// processed strictly serially"). Released on drop via a best-effort
/// fire-and-forget delete — callers that need a guaranteed synchronous
/// release should call [`ConversationLock::release`] explicitly.
pub struct ConversationLock {
    pool: Pool,
    conversation_id: ConversationId,
    token: String,
}

/// Acquires the exclusive lock for `conversation_id`, retrying on
/// contention until `ACQUIRE_TIMEOUT` elapses. Implements the read-modify-
/// write serialization the state store must provide per §5: two concurrent
/// inbound messages for the same conversation id never interleave their
/// FSM transitions.
#[instrument(skip(pool), fields(conversation_id = %conversation_id))]
pub async fn acquire(pool: Pool, conversation_id: &ConversationId) -> Result<ConversationLock> {
    let token = Uuid::new_v4().to_string();
    let key = lock_key(conversation_id);
    let deadline = tokio::time::Instant::now() + ACQUIRE_TIMEOUT;

    loop {
        let mut conn = pool.get().await?;
        let set_result: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(LOCK_TTL_MS)
            .query_async(&mut conn)
            .await?;

        if set_result.is_some() {
            return Ok(ConversationLock {
                pool,
                conversation_id: conversation_id.clone(),
                token,
            });
        }

        if tokio::time::Instant::now() >= deadline {
            return Err(crate::error::StateError::NotFound {
                conversation_id: conversation_id.as_str().to_string(),
            });
        }
        sleep(RETRY_INTERVAL).await;
    }
}

impl ConversationLock {
    /// Release the lock only if it is still held by this token — a stale
    /// lock past its TTL may already have been reclaimed by another holder,
    /// and this must not delete theirs.
    #[instrument(skip(self), fields(conversation_id = %self.conversation_id))]
    pub async fn release(self) -> Result<()> {
        let mut conn = self.pool.get().await?;
        let key = lock_key(&self.conversation_id);
        let held: Option<String> = conn.get(&key).await?;
        if held.as_deref() == Some(self.token.as_str()) {
            let _: () = conn.del(&key).await?;
        } else {
            warn!("lock already expired or reclaimed by another holder, not releasing");
        }
        Ok(())
    }
}
