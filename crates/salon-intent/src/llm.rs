//! A purpose-built OpenRouter chat-completion client (§6.6). OpenRouter
//! speaks the OpenAI chat-completions dialect, so the request/response
//! shapes mirror the teacher's `openai.rs` provider — but this is not a
//! multi-provider abstraction: the LLM's internals are opaque per spec.md
//! §1, and classification/formatting are the only two call sites, so one
//! small client covers both instead of a pluggable `LlmProvider` trait.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::error::LlmError;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
const BASE_DELAY_SECS: u64 = 2;
const MAX_DELAY_SECS: u64 = 10;
const MAX_ATTEMPTS: u32 = 3;
const JITTER_FRACTION: f64 = 0.10;

#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub site_url: Option<String>,
    pub site_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system", content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user", content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant", content: content.into() }
    }
}

#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ChatOutcome {
    pub content: String,
    pub tool_calls: Vec<ToolCallResult>,
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { http, config })
    }

    /// A single-shot completion with no tool choices — used by the intent
    /// classifier (§4.3) and the response formatter's creative rewrite pass
    /// (§4.7).
    #[instrument(skip(self, messages))]
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<ChatOutcome, LlmError> {
        self.complete_with_tools(messages, &[]).await
    }

    /// A completion where the model may additionally choose to call one of
    /// `tools` — used by the non-booking handler (§4.10). `tools` are
    /// already-shaped OpenAI-style `{"type": "function", "function": {...}}`
    /// entries; the caller builds them (from `salon-tools`' registry) rather
    /// than this crate knowing about the tool table.
    #[instrument(skip(self, messages, tools))]
    pub async fn complete_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<ChatOutcome, LlmError> {
        retry_with_backoff(|| self.send_once(messages, tools)).await
    }

    async fn send_once(&self, messages: &[ChatMessage], tools: &[Value]) -> Result<ChatOutcome, LlmError> {
        let body = self.build_body(messages, tools);
        let url = format!("{}/chat/completions", self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL));

        debug!(model = %self.config.model, "sending request to openrouter");

        let mut req = self.http.post(&url).bearer_auth(&self.config.api_key).json(&body);
        if let Some(site) = &self.config.site_url {
            req = req.header("HTTP-Referer", site);
        }
        if let Some(name) = &self.config.site_name {
            req = req.header("X-Title", name);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();

        if status == 429 {
            let retry_after_ms = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|s| s * 1000)
                .unwrap_or(5000);
            return Err(LlmError::RateLimited { retry_after_ms });
        }

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status, body = %body, "openrouter api error");
            return Err(LlmError::Api { status, body });
        }

        let parsed: ApiResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        Ok(into_outcome(parsed))
    }

    fn build_body(&self, messages: &[ChatMessage], tools: &[Value]) -> Value {
        let msgs: Vec<Value> = messages
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content}))
            .collect();

        let mut body = json!({
            "model": self.config.model,
            "messages": msgs,
            "stream": false,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        body
    }
}

fn jitter_secs(base_secs: u64) -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    let max_jitter = ((base_secs as f64) * JITTER_FRACTION) as u64;
    if max_jitter == 0 {
        return 0;
    }
    (nanos as u64) % max_jitter
}

/// §7 category 2: LLM timeouts/5xx/rate-limits retried with 2-10s backoff,
/// up to three attempts, mirroring `salon_channels::retry_with_backoff`'s
/// schedule for the other external dependencies.
async fn retry_with_backoff<F, Fut, T>(mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, LlmError>>,
{
    let mut delay_secs = BASE_DELAY_SECS;
    for attempt in 1..=MAX_ATTEMPTS {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt == MAX_ATTEMPTS || !e.is_transient() => return Err(e),
            Err(e) => {
                let total = delay_secs + jitter_secs(delay_secs);
                warn!(attempt, max = MAX_ATTEMPTS, error = %e, retry_after_secs = total, "llm call failed, retrying");
                sleep(Duration::from_secs(total)).await;
                delay_secs = (delay_secs * 2).min(MAX_DELAY_SECS);
            }
        }
    }
    unreachable!("retry loop exited without returning")
}

fn into_outcome(resp: ApiResponse) -> ChatOutcome {
    let choice = resp.choices.into_iter().next();
    let content = choice
        .as_ref()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();
    let tool_calls = choice
        .and_then(|c| c.message.tool_calls)
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallResult {
            id: tc.id,
            name: tc.function.name,
            arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(Value::Null),
        })
        .collect();
    ChatOutcome { content, tool_calls }
}

#[derive(Deserialize)]
struct ApiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}
