//! Read-only index of the signed-in identity's historical threads.
//!
//! The index is a snapshot, rebuilt by re-querying the backend after any
//! thread-affecting event. It is never patched in place, and it is always
//! safe to discard and refetch.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mindr_auth::CredentialStore;
use mindr_core::{Message, ThreadId};

use crate::backend::{AssistantBackend, ThreadMessage};

/// One historical thread: its id and ordered transcript.
#[derive(Debug, Clone)]
pub struct ThreadSnapshot {
    pub id: ThreadId,
    pub messages: Vec<Message>,
}

/// Snapshot index of prior threads, keyed by thread id.
#[derive(Clone)]
pub struct ThreadHistoryIndex {
    store: CredentialStore,
    backend: Arc<dyn AssistantBackend>,
    snapshot: Arc<Mutex<HashMap<ThreadId, Vec<Message>>>>,
}

impl ThreadHistoryIndex {
    pub fn new(store: CredentialStore, backend: Arc<dyn AssistantBackend>) -> Self {
        Self {
            store,
            backend,
            snapshot: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Refetch all threads for the active identity and replace the snapshot.
    ///
    /// Fails silently from the caller's perspective: staleness of history is
    /// non-fatal, so errors are logged and the previous snapshot kept.
    pub async fn refresh(&self) {
        let Some(identity) = self.store.identity() else {
            tracing::debug!("Thread history refresh skipped: no identity");
            return;
        };

        let token = match self.store.identity_token().await {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "Thread history refresh failed to acquire token");
                return;
            }
        };

        match self.backend.list_threads(&token, &identity.uid).await {
            Ok(threads) => {
                let rebuilt: HashMap<ThreadId, Vec<Message>> = threads
                    .into_iter()
                    .map(|(id, messages)| {
                        (
                            ThreadId::new(id),
                            messages.iter().map(to_message).collect(),
                        )
                    })
                    .collect();
                let count = rebuilt.len();
                *self.snapshot.lock().expect("snapshot mutex poisoned") = rebuilt;
                tracing::debug!(threads = count, "Thread history refreshed");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Thread history refresh failed; keeping previous snapshot");
            }
        }
    }

    /// All known threads, most recent first.
    ///
    /// Thread ids are time-derived, so the lexical descending order of ids
    /// is the chronological descending order of threads.
    pub fn list(&self) -> Vec<ThreadSnapshot> {
        let snapshot = self.snapshot.lock().expect("snapshot mutex poisoned");
        let mut threads: Vec<ThreadSnapshot> = snapshot
            .iter()
            .map(|(id, messages)| ThreadSnapshot {
                id: id.clone(),
                messages: messages.clone(),
            })
            .collect();
        threads.sort_by(|a, b| b.id.cmp(&a.id));
        threads
    }

    /// The transcript of one thread, if it is in the current snapshot.
    pub fn get(&self, id: &ThreadId) -> Option<Vec<Message>> {
        self.snapshot
            .lock()
            .expect("snapshot mutex poisoned")
            .get(id)
            .cloned()
    }
}

/// Map a backend history record to a transcript message. Any role other
/// than `user` renders as the assistant.
fn to_message(record: &ThreadMessage) -> Message {
    if record.role == "user" {
        Message::user(record.content.clone())
    } else {
        Message::assistant(record.content.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
