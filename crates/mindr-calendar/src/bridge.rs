//! Bridge between the credential store and the calendar service.
//!
//! Every call is gated on a connected calendar credential. An authorization
//! rejection comes back as a distinguished outcome so the caller can clear
//! the credential and prompt re-authorization; the bridge never retries
//! with a credential the service has already rejected.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};

use mindr_auth::CredentialStore;
use mindr_core::{MindrError, Result};

use crate::client::{CalendarApi, CalendarEvent, EventTime};

/// Outcome of a gated calendar operation.
#[derive(Debug)]
pub enum CalendarOutcome<T> {
    /// No calendar credential is connected. No network call was made.
    NotConnected,
    /// The service rejected the credential. The caller should clear it and
    /// prompt the user to re-authorize.
    CredentialExpired,
    Ready(T),
}

#[derive(Clone)]
pub struct CalendarBridge {
    store: CredentialStore,
    api: Arc<dyn CalendarApi>,
}

impl CalendarBridge {
    pub fn new(store: CredentialStore, api: Arc<dyn CalendarApi>) -> Self {
        Self { store, api }
    }

    /// Events from now onward, start-time ascending.
    pub async fn list_upcoming(&self) -> Result<CalendarOutcome<Vec<CalendarEvent>>> {
        let Some(credential) = self.store.calendar_credential() else {
            tracing::debug!("Calendar listing skipped: no credential connected");
            return Ok(CalendarOutcome::NotConnected);
        };

        let time_min = Utc::now().to_rfc3339();
        match self
            .api
            .list_events(&credential.access_token, &time_min)
            .await
        {
            Ok(events) => {
                tracing::debug!(events = events.len(), "Calendar listing fetched");
                Ok(CalendarOutcome::Ready(events))
            }
            Err(MindrError::CredentialExpired) => {
                tracing::warn!("Calendar credential rejected during listing");
                Ok(CalendarOutcome::CredentialExpired)
            }
            Err(e) => Err(e),
        }
    }

    /// Create one event in the caller's local time zone.
    ///
    /// Validation happens before any network traffic: the summary must be
    /// non-empty after trimming and the end must be strictly after the
    /// start. The created event is not returned; callers re-list to
    /// observe it.
    pub async fn create_event(
        &self,
        summary: &str,
        start: DateTime<Local>,
        end: DateTime<Local>,
    ) -> Result<CalendarOutcome<()>> {
        let summary = summary.trim();
        if summary.is_empty() {
            return Err(MindrError::Validation(
                "event summary must not be empty".to_string(),
            ));
        }
        if end <= start {
            return Err(MindrError::Validation(
                "event end must be after its start".to_string(),
            ));
        }

        let Some(credential) = self.store.calendar_credential() else {
            tracing::debug!("Event creation skipped: no credential connected");
            return Ok(CalendarOutcome::NotConnected);
        };

        let event = CalendarEvent {
            summary: summary.to_string(),
            start: local_boundary(start),
            end: local_boundary(end),
        };

        match self.api.create_event(&credential.access_token, &event).await {
            Ok(()) => {
                tracing::info!(summary = %event.summary, "Calendar event created");
                Ok(CalendarOutcome::Ready(()))
            }
            Err(MindrError::CredentialExpired) => {
                tracing::warn!("Calendar credential rejected during event creation");
                Ok(CalendarOutcome::CredentialExpired)
            }
            Err(e) => Err(e),
        }
    }
}

/// Event boundary carrying the caller's local UTC offset as its zone.
fn local_boundary(at: DateTime<Local>) -> EventTime {
    EventTime {
        date_time: Some(at.to_rfc3339()),
        date: None,
        time_zone: Some(at.format("%:z").to_string()),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;

    use mindr_auth::{InMemorySessionCache, StaticTokenIssuer};

    struct FakeCalendarApi {
        list_result: Mutex<Result<Vec<CalendarEvent>>>,
        create_result: Mutex<Result<()>>,
        list_calls: AtomicUsize,
        create_calls: AtomicUsize,
        created: Mutex<Vec<CalendarEvent>>,
        tokens_seen: Mutex<Vec<String>>,
    }

    impl FakeCalendarApi {
        fn new() -> Self {
            Self {
                list_result: Mutex::new(Ok(Vec::new())),
                create_result: Mutex::new(Ok(())),
                list_calls: AtomicUsize::new(0),
                create_calls: AtomicUsize::new(0),
                created: Mutex::new(Vec::new()),
                tokens_seen: Mutex::new(Vec::new()),
            }
        }

        fn set_list_result(&self, result: Result<Vec<CalendarEvent>>) {
            *self.list_result.lock().unwrap() = result;
        }

        fn set_create_result(&self, result: Result<()>) {
            *self.create_result.lock().unwrap() = result;
        }
    }

    fn clone_error(e: &MindrError) -> MindrError {
        match e {
            MindrError::CredentialExpired => MindrError::CredentialExpired,
            MindrError::Backend { status, message } => MindrError::Backend {
                status: *status,
                message: message.clone(),
            },
            other => MindrError::Network(other.to_string()),
        }
    }

    #[async_trait]
    impl CalendarApi for FakeCalendarApi {
        async fn list_events(
            &self,
            access_token: &str,
            _time_min: &str,
        ) -> Result<Vec<CalendarEvent>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.tokens_seen
                .lock()
                .unwrap()
                .push(access_token.to_string());
            match &*self.list_result.lock().unwrap() {
                Ok(events) => Ok(events.clone()),
                Err(e) => Err(clone_error(e)),
            }
        }

        async fn create_event(
            &self,
            access_token: &str,
            event: &CalendarEvent,
        ) -> Result<()> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            self.tokens_seen
                .lock()
                .unwrap()
                .push(access_token.to_string());
            self.created.lock().unwrap().push(event.clone());
            match &*self.create_result.lock().unwrap() {
                Ok(()) => Ok(()),
                Err(e) => Err(clone_error(e)),
            }
        }
    }

    fn store_with_credential(token: Option<&str>) -> CredentialStore {
        let store = CredentialStore::new(
            Arc::new(StaticTokenIssuer::new("id-token")),
            Arc::new(InMemorySessionCache::new()),
        );
        if let Some(token) = token {
            store.set_calendar_credential(token);
        }
        store
    }

    fn bridge_with(
        token: Option<&str>,
        api: Arc<FakeCalendarApi>,
    ) -> CalendarBridge {
        CalendarBridge::new(store_with_credential(token), api)
    }

    fn timed_event(summary: &str) -> CalendarEvent {
        CalendarEvent {
            summary: summary.to_string(),
            start: EventTime {
                date_time: Some("2024-03-05T09:00:00Z".to_string()),
                date: None,
                time_zone: None,
            },
            end: EventTime {
                date_time: Some("2024-03-05T10:00:00Z".to_string()),
                date: None,
                time_zone: None,
            },
        }
    }

    fn local(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, h, m, 0).unwrap()
    }

    #[tokio::test]
    async fn test_list_without_credential_skips_network() {
        let api = Arc::new(FakeCalendarApi::new());
        let bridge = bridge_with(None, Arc::clone(&api));

        let outcome = bridge.list_upcoming().await.unwrap();

        assert!(matches!(outcome, CalendarOutcome::NotConnected));
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_passes_credential_and_returns_events() {
        let api = Arc::new(FakeCalendarApi::new());
        api.set_list_result(Ok(vec![timed_event("Standup")]));
        let bridge = bridge_with(Some("cal-token"), Arc::clone(&api));

        let outcome = bridge.list_upcoming().await.unwrap();

        let CalendarOutcome::Ready(events) = outcome else {
            panic!("expected events");
        };
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Standup");
        assert_eq!(api.tokens_seen.lock().unwrap()[0], "cal-token");
    }

    #[tokio::test]
    async fn test_list_maps_rejected_credential_to_expired() {
        let api = Arc::new(FakeCalendarApi::new());
        api.set_list_result(Err(MindrError::CredentialExpired));
        let bridge = bridge_with(Some("stale-token"), Arc::clone(&api));

        let outcome = bridge.list_upcoming().await.unwrap();

        assert!(matches!(outcome, CalendarOutcome::CredentialExpired));
        // Exactly one attempt; no retry with the rejected credential.
        assert_eq!(api.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_list_propagates_transport_failure() {
        let api = Arc::new(FakeCalendarApi::new());
        api.set_list_result(Err(MindrError::Network("unreachable".to_string())));
        let bridge = bridge_with(Some("cal-token"), Arc::clone(&api));

        let result = bridge.list_upcoming().await;

        assert!(matches!(result, Err(MindrError::Network(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_summary_before_network() {
        let api = Arc::new(FakeCalendarApi::new());
        let bridge = bridge_with(Some("cal-token"), Arc::clone(&api));

        let result = bridge.create_event("   ", local(9, 0), local(10, 0)).await;

        assert!(matches!(result, Err(MindrError::Validation(_))));
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_end_not_after_start_before_network() {
        let api = Arc::new(FakeCalendarApi::new());
        let bridge = bridge_with(Some("cal-token"), Arc::clone(&api));

        let equal = bridge
            .create_event("Standup", local(9, 0), local(9, 0))
            .await;
        let inverted = bridge
            .create_event("Standup", local(10, 0), local(9, 0))
            .await;

        assert!(matches!(equal, Err(MindrError::Validation(_))));
        assert!(matches!(inverted, Err(MindrError::Validation(_))));
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_without_credential_skips_network() {
        let api = Arc::new(FakeCalendarApi::new());
        let bridge = bridge_with(None, Arc::clone(&api));

        let outcome = bridge
            .create_event("Standup", local(9, 0), local(10, 0))
            .await
            .unwrap();

        assert!(matches!(outcome, CalendarOutcome::NotConnected));
        assert_eq!(api.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_sends_local_times_with_offset() {
        let api = Arc::new(FakeCalendarApi::new());
        let bridge = bridge_with(Some("cal-token"), Arc::clone(&api));

        let start = local(9, 0);
        let outcome = bridge
            .create_event("  Standup  ", start, local(10, 0))
            .await
            .unwrap();

        assert!(matches!(outcome, CalendarOutcome::Ready(())));
        let created = api.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].summary, "Standup");
        assert_eq!(
            created[0].start.date_time.as_deref(),
            Some(start.to_rfc3339().as_str())
        );
        assert_eq!(
            created[0].start.time_zone.as_deref(),
            Some(start.format("%:z").to_string().as_str())
        );
        assert!(created[0].start.date.is_none());
    }

    #[tokio::test]
    async fn test_create_maps_rejected_credential_to_expired() {
        let api = Arc::new(FakeCalendarApi::new());
        api.set_create_result(Err(MindrError::CredentialExpired));
        let bridge = bridge_with(Some("stale-token"), Arc::clone(&api));

        let outcome = bridge
            .create_event("Standup", local(9, 0), local(10, 0))
            .await
            .unwrap();

        assert!(matches!(outcome, CalendarOutcome::CredentialExpired));
    }
}
