//! Calendar RPC operations consumed by the availability and booking tools
//! (§6.4). Shaped after Google Calendar's events API — a free/busy query and
//! the CRUD operations on events, treated as an opaque external dependency
//! guarded by its own circuit breaker.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::ChannelError;
use crate::retry::retry_with_backoff;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewEvent {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EventPatch {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[async_trait]
pub trait CalendarClient: Send + Sync {
    async fn list_busy(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, ChannelError>;

    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> Result<CalendarEvent, ChannelError>;

    async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<CalendarEvent, ChannelError>;

    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), ChannelError>;
}

#[derive(Debug, Clone)]
pub struct GoogleCalendarConfig {
    pub api_url: String,
    pub api_token: String,
}

pub struct GoogleCalendarClient {
    http: reqwest::Client,
    config: GoogleCalendarConfig,
}

impl GoogleCalendarClient {
    pub fn new(config: GoogleCalendarConfig) -> Result<Self, ChannelError> {
        let http = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .map_err(ChannelError::Transport)?;
        Ok(Self { http, config })
    }

    fn events_url(&self, calendar_id: &str) -> String {
        format!("{}/calendars/{}/events", self.config.api_url, calendar_id)
    }

    fn auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.bearer_auth(&self.config.api_token)
    }

    async fn parse_event(resp: reqwest::Response) -> Result<CalendarEvent, ChannelError> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ChannelError::Api {
                dependency: "calendar",
                status,
                body: text,
            });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| ChannelError::MalformedResponse("calendar".to_string(), e))
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendarClient {
    #[instrument(skip(self))]
    async fn list_busy(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> Result<Vec<BusyInterval>, ChannelError> {
        retry_with_backoff("calendar", || async {
            let resp = self
                .auth(self.http.get(format!("{}/freeBusy", self.config.api_url)))
                .query(&[
                    ("calendarId", calendar_id),
                    ("timeMin", &time_min.to_rfc3339()),
                    ("timeMax", &time_max.to_rfc3339()),
                ])
                .send()
                .await?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                return Err(ChannelError::Api {
                    dependency: "calendar",
                    status,
                    body: text,
                });
            }
            let bytes = resp.bytes().await?;
            serde_json::from_slice(&bytes)
                .map_err(|e| ChannelError::MalformedResponse("calendar".to_string(), e))
        })
        .await
    }

    #[instrument(skip(self, event))]
    async fn create_event(&self, calendar_id: &str, event: &NewEvent) -> Result<CalendarEvent, ChannelError> {
        retry_with_backoff("calendar", || async {
            let resp = self
                .auth(self.http.post(self.events_url(calendar_id)))
                .json(event)
                .send()
                .await?;
            Self::parse_event(resp).await
        })
        .await
    }

    #[instrument(skip(self, patch))]
    async fn patch_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        patch: &EventPatch,
    ) -> Result<CalendarEvent, ChannelError> {
        retry_with_backoff("calendar", || async {
            let url = format!("{}/{}", self.events_url(calendar_id), event_id);
            let resp = self.auth(self.http.patch(&url)).json(patch).send().await?;
            Self::parse_event(resp).await
        })
        .await
    }

    #[instrument(skip(self))]
    async fn delete_event(&self, calendar_id: &str, event_id: &str) -> Result<(), ChannelError> {
        retry_with_backoff("calendar", || async {
            let url = format!("{}/{}", self.events_url(calendar_id), event_id);
            let resp = self.auth(self.http.delete(&url)).send().await?;
            if !resp.status().is_success() && resp.status().as_u16() != 404 {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                return Err(ChannelError::Api {
                    dependency: "calendar",
                    status,
                    body: text,
                });
            }
            Ok(())
        })
        .await
    }
}
