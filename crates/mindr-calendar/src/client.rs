//! Wire types and REST client for the calendar service.
//!
//! Two endpoints on the primary calendar: `GET events` (upcoming, expanded,
//! start-time ordered) and `POST events` (create). Both are bearer-token
//! authenticated with the calendar credential, not the identity token.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mindr_core::config::CalendarConfig;
use mindr_core::{MindrError, Result};

/// Event boundary as the service represents it: a timed event carries
/// `dateTime` (RFC 3339), an all-day event carries `date` instead.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventTime {
    #[serde(rename = "dateTime", skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(rename = "timeZone", skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventTime {
    /// The displayable boundary, whichever representation is present.
    pub fn display(&self) -> &str {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
}

/// Listing response body. Only the items matter to this client.
#[derive(Debug, Default, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

/// Seam to the calendar REST service.
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// Events from `time_min` onward, start-time ascending, recurring
    /// events expanded to single occurrences.
    async fn list_events(&self, access_token: &str, time_min: &str) -> Result<Vec<CalendarEvent>>;

    /// Create one event. The service is the source of truth; callers
    /// re-list to observe the created event.
    async fn create_event(&self, access_token: &str, event: &CalendarEvent) -> Result<()>;
}

/// HTTP implementation over reqwest.
pub struct HttpCalendarApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCalendarApi {
    pub fn new(config: &CalendarConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MindrError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Map a non-2xx calendar response. 401/403 means the credential is no
    /// longer accepted and must be re-acquired by the user.
    fn status_error(status: reqwest::StatusCode) -> MindrError {
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            MindrError::CredentialExpired
        } else {
            MindrError::Backend {
                status: status.as_u16(),
                message: format!(
                    "calendar service returned {} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("unknown status")
                ),
            }
        }
    }
}

#[async_trait]
impl CalendarApi for HttpCalendarApi {
    async fn list_events(&self, access_token: &str, time_min: &str) -> Result<Vec<CalendarEvent>> {
        let url = format!("{}/events", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("timeMin", time_min),
                ("orderBy", "startTime"),
                ("singleEvents", "true"),
            ])
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| MindrError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status));
        }

        let page: EventsPage = response
            .json()
            .await
            .map_err(|e| MindrError::Serialization(e.to_string()))?;
        Ok(page.items)
    }

    async fn create_event(&self, access_token: &str, event: &CalendarEvent) -> Result<()> {
        let url = format!("{}/events", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .json(event)
            .send()
            .await
            .map_err(|e| MindrError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::status_error(status));
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
