//! The two pub/sub worker loops (C12, §4.12): the inbound worker drives one
//! turn through the orchestrator for every message on `incoming_messages`
//! and republishes the reply to `outgoing_messages`; the outbound worker
//! forwards those replies to the messaging gateway.

use std::sync::Arc;

use futures_util::StreamExt;
use salon_channels::MessagingGateway;
use salon_orchestrator::Orchestrator;
use salon_state::PubSubClient;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

const INCOMING_CHANNEL: &str = "incoming_messages";
const OUTGOING_CHANNEL: &str = "outgoing_messages";

#[derive(Debug, Deserialize)]
struct IncomingMessage {
    conversation_id: String,
    customer_phone: String,
    message_text: String,
}

#[derive(Debug, Serialize)]
struct OutgoingEvent {
    conversation_id: String,
    customer_phone: String,
    message: String,
}

#[derive(Debug, Deserialize)]
struct OutgoingMessage {
    conversation_id: String,
    customer_phone: String,
    message: String,
}

/// Drains `incoming_messages`, spawning one task per message so a slow turn
/// never blocks the next dequeue. No new message is dequeued once `shutdown`
/// fires; in-flight turns are awaited before this returns.
pub async fn run_inbound(pubsub: PubSubClient, orchestrator: Arc<Orchestrator>, mut shutdown: watch::Receiver<bool>) {
    let mut stream = match pubsub.subscribe(INCOMING_CHANNEL).await {
        Ok(s) => Box::pin(s),
        Err(e) => {
            error!("failed to subscribe to {INCOMING_CHANNEL}: {e}");
            return;
        }
    };

    let mut inflight = JoinSet::new();
    info!("inbound worker listening on {INCOMING_CHANNEL}");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("inbound worker shutting down, draining in-flight turns");
                    break;
                }
            }
            Some(raw) = stream.next() => {
                let parsed: IncomingMessage = match serde_json::from_str(&raw) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("malformed {INCOMING_CHANNEL} payload, dropped: {e}");
                        continue;
                    }
                };
                let orchestrator = orchestrator.clone();
                let pubsub = pubsub.clone();
                inflight.spawn(async move {
                    process_one(orchestrator, pubsub, parsed).await;
                });
            }
        }
    }

    while inflight.join_next().await.is_some() {}
}

async fn process_one(orchestrator: Arc<Orchestrator>, pubsub: PubSubClient, msg: IncomingMessage) {
    let conversation_id = msg.conversation_id.clone().into();
    let outcome = orchestrator
        .process_message(&conversation_id, &msg.customer_phone, &msg.message_text)
        .await;

    let reply_text = match outcome {
        Ok(outcome) => outcome.reply_text,
        Err(e) => {
            error!(conversation_id = %msg.conversation_id, "turn failed: {e}");
            return;
        }
    };

    let event = OutgoingEvent {
        conversation_id: msg.conversation_id,
        customer_phone: msg.customer_phone,
        message: reply_text,
    };
    if let Err(e) = pubsub.publish(OUTGOING_CHANNEL, &event).await {
        error!("failed to publish to {OUTGOING_CHANNEL}: {e}");
    }
}

/// Drains `outgoing_messages`, forwarding each to the messaging gateway.
/// Retries are the gateway's own concern (`salon_channels::retry_with_backoff`,
/// §7) — this loop just logs and moves on when a send ultimately fails.
pub async fn run_outbound(
    pubsub: PubSubClient,
    messaging: Arc<dyn MessagingGateway>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut stream = match pubsub.subscribe(OUTGOING_CHANNEL).await {
        Ok(s) => Box::pin(s),
        Err(e) => {
            error!("failed to subscribe to {OUTGOING_CHANNEL}: {e}");
            return;
        }
    };

    let mut inflight = JoinSet::new();
    info!("outbound worker listening on {OUTGOING_CHANNEL}");

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("outbound worker shutting down, draining in-flight sends");
                    break;
                }
            }
            Some(raw) = stream.next() => {
                let parsed: OutgoingMessage = match serde_json::from_str(&raw) {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("malformed {OUTGOING_CHANNEL} payload, dropped: {e}");
                        continue;
                    }
                };
                let messaging = messaging.clone();
                inflight.spawn(async move {
                    send_one(messaging, parsed).await;
                });
            }
        }
    }

    while inflight.join_next().await.is_some() {}
}

async fn send_one(messaging: Arc<dyn MessagingGateway>, msg: OutgoingMessage) {
    let result = messaging
        .send_message(&msg.customer_phone, &msg.message, Some(&msg.conversation_id))
        .await;
    if let Err(e) = result {
        error!(conversation_id = %msg.conversation_id, "failed to deliver reply: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incoming_message_parses_the_wire_shape() {
        let raw = r#"{"conversation_id":"c1","customer_phone":"+34600000000","message_text":"hola"}"#;
        let parsed: IncomingMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.conversation_id, "c1");
        assert_eq!(parsed.customer_phone, "+34600000000");
        assert_eq!(parsed.message_text, "hola");
    }

    #[test]
    fn outgoing_event_serializes_the_wire_shape() {
        let event = OutgoingEvent {
            conversation_id: "c1".to_string(),
            customer_phone: "+34600000000".to_string(),
            message: "hola".to_string(),
        };
        let raw = serde_json::to_value(&event).unwrap();
        assert_eq!(raw["conversation_id"], "c1");
        assert_eq!(raw["message"], "hola");
    }

    #[test]
    fn malformed_incoming_payload_fails_to_parse() {
        let raw = r#"{"conversation_id":"c1"}"#;
        let parsed: Result<IncomingMessage, _> = serde_json::from_str(raw);
        assert!(parsed.is_err());
    }
}
