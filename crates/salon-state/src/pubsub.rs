use futures_util::StreamExt;
use redis::AsyncCommands;
use tracing::instrument;

use crate::error::Result;

/// Thin wrapper over a Redis client used for the two fixed channels
/// `incoming_messages`/`outgoing_messages` (§4.12, §6.1-6.2). Kept separate
/// from [`crate::manager::CheckpointStore`]'s pool because pub/sub
/// connections are not multiplexed the same way regular commands are —
/// each subscriber needs its own dedicated connection for the lifetime of
/// the subscription.
#[derive(Clone)]
pub struct PubSubClient {
    client: redis::Client,
}

impl PubSubClient {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Publish a JSON-serializable payload to `channel` (e.g. `outgoing_messages`).
    #[instrument(skip(self, payload))]
    pub async fn publish<T: serde::Serialize>(&self, channel: &str, payload: &T) -> Result<()> {
        let raw = serde_json::to_string(payload)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let _: () = conn.publish(channel, raw).await?;
        Ok(())
    }

    /// Subscribe to `channel`, yielding each message's raw payload string.
    /// The returned stream runs until the underlying connection closes; the
    /// caller loops `while let Some(raw) = stream.next().await` and is
    /// responsible for deserializing and for graceful-shutdown teardown
    /// (§4.12: "no new messages are dequeued once the flag is set").
    #[instrument(skip(self))]
    pub async fn subscribe(&self, channel: &str) -> Result<impl futures_util::Stream<Item = String>> {
        let conn = self.client.get_async_pubsub().await?;
        let mut pubsub = conn;
        pubsub.subscribe(channel).await?;
        let stream = pubsub
            .into_on_message()
            .filter_map(|msg| async move { msg.get_payload::<String>().ok() });
        Ok(stream)
    }
}
