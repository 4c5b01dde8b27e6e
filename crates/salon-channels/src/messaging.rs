//! Messaging gateway operations consumed by the core (§6.3). Shaped after
//! Chatwoot's conversation/contact API — the concrete vendor client is
//! treated as an opaque RPC per spec.md §1, so only the three operations the
//! orchestrator and tools actually call are modelled.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use crate::error::ChannelError;
use crate::retry::retry_with_backoff;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a free-form text message. Idempotent at the vendor.
    async fn send_message(
        &self,
        phone: &str,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<bool, ChannelError>;

    /// Send an approved template message — required outside the 24h
    /// customer-initiated session window.
    async fn send_template_message(
        &self,
        phone: &str,
        template_name: &str,
        body_params: &HashMap<u32, String>,
        conversation_id: Option<&str>,
    ) -> Result<bool, ChannelError>;

    /// Toggle `atencion_automatica` (or set any other conversation custom
    /// attribute) — used when escalating to a human agent.
    async fn update_conversation_custom_attributes(
        &self,
        conversation_id: &str,
        attributes: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ChannelError>;
}

#[derive(Debug, Clone)]
pub struct ChatwootConfig {
    pub api_url: String,
    pub api_token: String,
    pub account_id: String,
    pub inbox_id: String,
}

pub struct ChatwootGateway {
    http: reqwest::Client,
    config: ChatwootConfig,
}

impl ChatwootGateway {
    pub fn new(config: ChatwootConfig) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(ChannelError::Transport)?;
        Ok(Self { http, config })
    }

    fn conversations_url(&self, conversation_id: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}/conversations/{}",
            self.config.api_url, self.config.account_id, conversation_id
        )
    }

    /// Proactive sends (scheduler jobs) have no conversation context — find
    /// the contact's existing conversation by phone, or open a new one on
    /// this gateway's configured inbox.
    async fn resolve_conversation_id(&self, phone: &str) -> Result<String, ChannelError> {
        retry_with_backoff("chatwoot", || async {
            let search_url = format!(
                "{}/api/v1/accounts/{}/contacts/search",
                self.config.api_url, self.config.account_id
            );
            let resp = self
                .http
                .get(&search_url)
                .header("api_access_token", &self.config.api_token)
                .query(&[("q", phone)])
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                return Err(ChannelError::Api {
                    dependency: "chatwoot",
                    status,
                    body: text,
                });
            }
            let found: ContactSearchResponse = resp
                .json()
                .await
                .map_err(ChannelError::Transport)?;
            let contact_id = found
                .payload
                .first()
                .map(|c| c.id)
                .ok_or_else(|| ChannelError::Api {
                    dependency: "chatwoot",
                    status: 404,
                    body: format!("no contact found for phone {phone}"),
                })?;

            let create_url = format!(
                "{}/api/v1/accounts/{}/conversations",
                self.config.api_url, self.config.account_id
            );
            let resp = self
                .http
                .post(&create_url)
                .header("api_access_token", &self.config.api_token)
                .json(&json!({"source_id": phone, "contact_id": contact_id, "inbox_id": self.config.inbox_id}))
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                return Err(ChannelError::Api {
                    dependency: "chatwoot",
                    status,
                    body: text,
                });
            }
            let created: ConversationCreatedResponse = resp
                .json()
                .await
                .map_err(ChannelError::Transport)?;
            Ok(created.id.to_string())
        })
        .await
    }

    async fn conversation_id_for(
        &self,
        phone: &str,
        conversation_id: Option<&str>,
    ) -> Result<String, ChannelError> {
        match conversation_id {
            Some(id) => Ok(id.to_string()),
            None => self.resolve_conversation_id(phone).await,
        }
    }

    async fn post_message(&self, conversation_id: &str, body: &serde_json::Value) -> Result<bool, ChannelError> {
        retry_with_backoff("chatwoot", || async {
            let url = format!("{}/messages", self.conversations_url(conversation_id));
            let resp = self
                .http
                .post(&url)
                .header("api_access_token", &self.config.api_token)
                .json(body)
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                return Err(ChannelError::Api {
                    dependency: "chatwoot",
                    status,
                    body: text,
                });
            }
            Ok(true)
        })
        .await
    }
}

#[async_trait]
impl MessagingGateway for ChatwootGateway {
    #[instrument(skip(self, text))]
    async fn send_message(
        &self,
        phone: &str,
        text: &str,
        conversation_id: Option<&str>,
    ) -> Result<bool, ChannelError> {
        tracing::debug!(phone, "sending message");
        let conversation_id = self.conversation_id_for(phone, conversation_id).await?;
        self.post_message(
            &conversation_id,
            &json!({"content": text, "message_type": "outgoing"}),
        )
        .await
    }

    #[instrument(skip(self, body_params))]
    async fn send_template_message(
        &self,
        phone: &str,
        template_name: &str,
        body_params: &HashMap<u32, String>,
        conversation_id: Option<&str>,
    ) -> Result<bool, ChannelError> {
        tracing::debug!(phone, template_name, "sending template message");
        let conversation_id = self.conversation_id_for(phone, conversation_id).await?;
        let mut params: Vec<_> = body_params.iter().collect();
        params.sort_by_key(|(i, _)| **i);
        let body = json!({
            "content": template_name,
            "message_type": "outgoing",
            "template_params": {
                "name": template_name,
                "category": "UTILITY",
                "language": "es",
                "processed_params": params.into_iter().map(|(i, v)| (i.to_string(), v)).collect::<HashMap<_, _>>(),
            }
        });
        self.post_message(&conversation_id, &body).await
    }

    #[instrument(skip(self, attributes))]
    async fn update_conversation_custom_attributes(
        &self,
        conversation_id: &str,
        attributes: &HashMap<String, serde_json::Value>,
    ) -> Result<(), ChannelError> {
        retry_with_backoff("chatwoot", || async {
            let url = format!(
                "{}/custom_attributes",
                self.conversations_url(conversation_id)
            );
            let resp = self
                .http
                .post(&url)
                .header("api_access_token", &self.config.api_token)
                .json(&CustomAttributesPayload {
                    custom_attributes: attributes.clone(),
                })
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                return Err(ChannelError::Api {
                    dependency: "chatwoot",
                    status,
                    body: text,
                });
            }
            Ok(())
        })
        .await
    }
}

#[derive(Serialize)]
struct CustomAttributesPayload {
    custom_attributes: HashMap<String, serde_json::Value>,
}

#[derive(Deserialize)]
struct ContactSearchResponse {
    payload: Vec<ContactSummary>,
}

#[derive(Deserialize)]
struct ContactSummary {
    id: u64,
}

#[derive(Deserialize)]
struct ConversationCreatedResponse {
    id: u64,
}
