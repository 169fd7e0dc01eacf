//! The credential store: identity + calendar credential with change
//! notification.
//!
//! Exactly one identity may be active at a time. The calendar credential has
//! an independent lifetime: absence of one never blocks operations that need
//! only the other.

use std::sync::{Arc, Mutex};

use mindr_core::{CalendarCredential, Identity, MindrError, Result};

use crate::cache::SessionCache;
use crate::issuer::TokenIssuer;

/// Cache key under which the calendar access token is persisted.
const CALENDAR_TOKEN_KEY: &str = "mindr.calendar_access_token";

/// Callback invoked with the identity state: once immediately on
/// registration, then on every subsequent change.
pub type IdentityListener = Box<dyn Fn(Option<Identity>) + Send + Sync>;

struct StoreState {
    identity: Option<Identity>,
    calendar: Option<CalendarCredential>,
}

struct StoreInner {
    state: Mutex<StoreState>,
    // Separate mutex so listeners are never invoked while the state lock is
    // held; a listener may re-enter the store.
    listeners: Mutex<Vec<IdentityListener>>,
    issuer: Arc<dyn TokenIssuer>,
    cache: Arc<dyn SessionCache>,
}

/// Thread-safe credential store. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CredentialStore {
    inner: Arc<StoreInner>,
}

impl CredentialStore {
    /// Create a store wired to the given issuer and session cache.
    ///
    /// A calendar credential left in the cache by a previous page of the
    /// same session is restored immediately.
    pub fn new(issuer: Arc<dyn TokenIssuer>, cache: Arc<dyn SessionCache>) -> Self {
        let calendar = cache.get(CALENDAR_TOKEN_KEY).map(|token| {
            tracing::debug!("Calendar credential restored from session cache");
            CalendarCredential::new(token)
        });
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(StoreState {
                    identity: None,
                    calendar,
                }),
                listeners: Mutex::new(Vec::new()),
                issuer,
                cache,
            }),
        }
    }

    /// Register a listener for identity changes.
    ///
    /// The listener is invoked once immediately with the present state, then
    /// on every sign-in, sign-out, and session restore.
    pub fn on_identity_change(&self, listener: IdentityListener) {
        let current = self.identity();
        listener(current);
        self.inner
            .listeners
            .lock()
            .expect("listeners mutex poisoned")
            .push(listener);
    }

    /// Record a sign-in (or session restore) and notify listeners.
    pub fn sign_in(&self, identity: Identity) {
        {
            let mut state = self.inner.state.lock().expect("state mutex poisoned");
            tracing::info!(uid = %identity.uid, "Identity signed in");
            state.identity = Some(identity);
        }
        self.notify();
    }

    /// Clear the identity and the calendar credential, then notify listeners.
    pub fn sign_out(&self) {
        {
            let mut state = self.inner.state.lock().expect("state mutex poisoned");
            if let Some(ref identity) = state.identity {
                tracing::info!(uid = %identity.uid, "Identity signed out");
            }
            state.identity = None;
            state.calendar = None;
        }
        self.inner.cache.remove(CALENDAR_TOKEN_KEY);
        self.notify();
    }

    /// The current identity, if one is signed in.
    pub fn identity(&self) -> Option<Identity> {
        self.inner
            .state
            .lock()
            .expect("state mutex poisoned")
            .identity
            .clone()
    }

    /// Obtain a freshly issued, short-lived identity token.
    ///
    /// Suspends while the provider issues it. Fails with `AuthUnavailable`
    /// when no identity is active; issuance failures propagate unretried.
    pub async fn identity_token(&self) -> Result<String> {
        let identity = self.identity().ok_or(MindrError::AuthUnavailable)?;
        self.inner.issuer.issue_token(&identity).await
    }

    /// Cache a calendar access token for the rest of the session.
    ///
    /// Last writer wins; writes only occur from the sign-in/connect flow.
    pub fn set_calendar_credential(&self, access_token: impl Into<String>) {
        let credential = CalendarCredential::new(access_token);
        self.inner
            .cache
            .put(CALENDAR_TOKEN_KEY, credential.access_token.clone());
        let mut state = self.inner.state.lock().expect("state mutex poisoned");
        state.calendar = Some(credential);
        tracing::debug!("Calendar credential stored");
    }

    /// The current calendar credential, if one is cached.
    pub fn calendar_credential(&self) -> Option<CalendarCredential> {
        self.inner
            .state
            .lock()
            .expect("state mutex poisoned")
            .calendar
            .clone()
    }

    /// Drop the calendar credential (e.g. after the service rejected it).
    pub fn clear_calendar_credential(&self) {
        self.inner.cache.remove(CALENDAR_TOKEN_KEY);
        let mut state = self.inner.state.lock().expect("state mutex poisoned");
        if state.calendar.take().is_some() {
            tracing::debug!("Calendar credential cleared");
        }
    }

    fn notify(&self) {
        let current = self.identity();
        let listeners = self
            .inner
            .listeners
            .lock()
            .expect("listeners mutex poisoned");
        for listener in listeners.iter() {
            listener(current.clone());
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
