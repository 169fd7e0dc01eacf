//! The conversation session: turns a user prompt (typed or spoken) into a
//! backend exchange and maintains the visible transcript.
//!
//! Failure policy: every failure becomes either a no-op or a locally
//! appended transcript message. Nothing here crashes the session, and
//! nothing retries automatically; every retry is a fresh user action.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use mindr_auth::CredentialStore;
use mindr_core::{Message, MindrError, ThreadId};

use crate::backend::{AssistantBackend, ToolCallRequest};
use crate::history::ThreadHistoryIndex;

/// Local notice appended instead of calling the backend while signed out.
const SIGN_IN_REQUIRED_NOTICE: &str = "You must be signed in to use the chat.";

/// Text of the assistant message that carries an authorization link.
const AUTHORIZE_CALENDAR_PROMPT: &str = "Click here to authorize calendar access";

struct SessionInner {
    store: CredentialStore,
    backend: Arc<dyn AssistantBackend>,
    history: ThreadHistoryIndex,
    thread_id: Mutex<Option<ThreadId>>,
    messages: Mutex<Vec<Message>>,
}

/// One multi-turn chat session. Cheap to clone; clones share the transcript.
///
/// Sends are serialized by callers that await each one; issuing a second
/// `send` before the first resolves is permitted, and each reply is anchored
/// next to its own optimistic user message regardless of resolution order.
/// There is no cancellation: a session that moves on while a send is in
/// flight will still see that reply applied when it arrives.
#[derive(Clone)]
pub struct ConversationSession {
    inner: Arc<SessionInner>,
}

impl ConversationSession {
    pub fn new(
        store: CredentialStore,
        backend: Arc<dyn AssistantBackend>,
        history: ThreadHistoryIndex,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                store,
                backend,
                history,
                thread_id: Mutex::new(None),
                messages: Mutex::new(Vec::new()),
            }),
        }
    }

    /// The current thread id, once the backend has assigned one.
    pub fn thread_id(&self) -> Option<ThreadId> {
        self.inner
            .thread_id
            .lock()
            .expect("thread id mutex poisoned")
            .clone()
    }

    /// Snapshot of the transcript in display order.
    pub fn messages(&self) -> Vec<Message> {
        self.inner
            .messages
            .lock()
            .expect("messages mutex poisoned")
            .clone()
    }

    /// Dispatch one prompt to the backend and reconcile the transcript.
    ///
    /// Empty-after-trim input is rejected silently. Without a signed-in
    /// identity a local notice is appended and no network call is made.
    /// Otherwise the user message is appended optimistically, the exchange
    /// runs, and the reply (or a failure message) is inserted immediately
    /// after that user message.
    pub async fn send(&self, prompt: &str) {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            tracing::debug!("Ignoring empty prompt");
            return;
        }

        if self.inner.store.identity().is_none() {
            tracing::debug!("Send blocked: no signed-in identity");
            self.append(Message::assistant(SIGN_IN_REQUIRED_NOTICE));
            return;
        }

        let user_message = Message::user(prompt);
        let anchor = user_message.id;
        self.append(user_message);

        let token = match self.inner.store.identity_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Token acquisition failed for send");
                self.insert_after(anchor, vec![network_failure_message(&e)]);
                return;
            }
        };

        let request = ToolCallRequest {
            prompt: prompt.to_string(),
            chat_id: self.thread_id().map(|id| id.0),
            access_token: self
                .inner
                .store
                .calendar_credential()
                .map(|c| c.access_token),
        };

        match self.inner.backend.tool_call(&token, &request).await {
            Ok(reply) => {
                if let Some(chat_id) = reply.chat_id {
                    self.adopt_thread_id(ThreadId::new(chat_id));
                }
                let mut replies = vec![Message::assistant(reply.response)];
                if let Some(url) = reply.authorization_url {
                    replies.push(Message::assistant_link(AUTHORIZE_CALENDAR_PROMPT, url));
                }
                self.insert_after(anchor, replies);
            }
            Err(MindrError::Backend { status, message }) => {
                tracing::warn!(status, message = %message, "Backend rejected send");
                self.insert_after(anchor, vec![Message::assistant(format!("Error: {}", message))]);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Send failed to reach the backend");
                self.insert_after(anchor, vec![network_failure_message(&e)]);
            }
        }
    }

    /// Clear the current thread id and transcript.
    ///
    /// Does not contact the backend: a thread only exists server-side once
    /// the first prompt of the new conversation is successfully sent.
    pub fn start_new_thread(&self) {
        *self
            .inner
            .thread_id
            .lock()
            .expect("thread id mutex poisoned") = None;
        self.inner
            .messages
            .lock()
            .expect("messages mutex poisoned")
            .clear();
        tracing::info!("Started new thread");
    }

    /// Replace the session state with a historical thread, then refresh the
    /// history index.
    pub async fn resume_thread(&self, thread_id: ThreadId, messages: Vec<Message>) {
        tracing::info!(thread = %thread_id, "Resuming thread");
        {
            let mut current = self
                .inner
                .thread_id
                .lock()
                .expect("thread id mutex poisoned");
            *current = Some(thread_id);
        }
        {
            let mut log = self
                .inner
                .messages
                .lock()
                .expect("messages mutex poisoned");
            *log = messages;
        }
        self.inner.history.refresh().await;
    }

    /// The history index this session consults for thread selection.
    pub fn history(&self) -> &ThreadHistoryIndex {
        &self.inner.history
    }

    fn adopt_thread_id(&self, id: ThreadId) {
        let mut current = self
            .inner
            .thread_id
            .lock()
            .expect("thread id mutex poisoned");
        if current.as_ref() != Some(&id) {
            tracing::debug!(thread = %id, "Adopted thread id from backend");
            *current = Some(id);
        }
    }

    fn append(&self, message: Message) {
        self.inner
            .messages
            .lock()
            .expect("messages mutex poisoned")
            .push(message);
    }

    /// Insert replies immediately after their anchor (the optimistic user
    /// message), keeping each prompt/reply pair adjacent even when replies
    /// resolve out of issue order. An anchor that is gone (the session was
    /// cleared or resumed meanwhile) lands the late replies at the end.
    fn insert_after(&self, anchor: Uuid, replies: Vec<Message>) {
        let mut messages = self
            .inner
            .messages
            .lock()
            .expect("messages mutex poisoned");
        match messages.iter().position(|m| m.id == anchor) {
            Some(index) => {
                for (offset, reply) in replies.into_iter().enumerate() {
                    messages.insert(index + 1 + offset, reply);
                }
            }
            None => messages.extend(replies),
        }
    }
}

/// Transcript message for a failure that never produced a backend response.
fn network_failure_message(error: &MindrError) -> Message {
    let detail = match error {
        MindrError::Network(msg) => msg.clone(),
        other => other.to_string(),
    };
    Message::assistant(format!("Network error: {}", detail))
}

// =============================================================================
// Tests
// =============================================================================
