use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// Messages
// =============================================================================

/// Who produced a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// One entry in a conversation transcript.
///
/// Messages are append-only: once added to a transcript they are never
/// edited. Insertion order is display order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, used to anchor a reply next to its prompt.
    pub id: Uuid,
    pub text: String,
    pub sender: Sender,
    /// Present when the message carries an actionable authorization link
    /// rather than prose.
    pub authorization_link: Option<String>,
}

impl Message {
    /// Create a user-originated message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::User,
            authorization_link: None,
        }
    }

    /// Create an assistant message.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::Assistant,
            authorization_link: None,
        }
    }

    /// Create an assistant message carrying an authorization link.
    pub fn assistant_link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            sender: Sender::Assistant,
            authorization_link: Some(url.into()),
        }
    }
}

// =============================================================================
// Threads
// =============================================================================

/// Opaque, time-derived thread identifier.
///
/// The backend creates thread ids from the thread's creation time, so the
/// lexical ordering of ids is also their chronological ordering. `Ord` on
/// this type is that lexical comparison and must remain stable and total.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-readable label for thread pickers: `MM/DD/YY HH:MM` derived
    /// from the RFC 3339 time embedded in the id, or the raw id when the
    /// time component does not parse.
    pub fn display_label(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.0) {
            Ok(dt) => dt.format("%m/%d/%y %H:%M").to_string(),
            Err(_) => self.0.clone(),
        }
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Credentials
// =============================================================================

/// The signed-in user's stable reference plus profile fields.
///
/// Created on a sign-in notification from the identity provider, cleared on
/// sign-out. Immutable during a session except for token refresh, which the
/// provider handles on its side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: String,
    pub email: String,
}

/// Bearer token scoped to the calendar service.
///
/// Independent lifetime from the identity token. No expiry metadata is
/// available: the credential is treated as valid until a request using it
/// fails with an authorization error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarCredential {
    pub access_token: String,
    pub acquired_at: DateTime<Utc>,
}

impl CalendarCredential {
    /// Wrap a freshly granted access token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            acquired_at: Utc::now(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
