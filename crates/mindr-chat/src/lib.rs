//! Conversational core of the mindr client.
//!
//! Owns the active thread, the ordered transcript, and dispatch of prompts
//! (typed or spoken) to the backend tool-call endpoint, plus the read-only
//! index of the signed-in identity's historical threads.

pub mod backend;
pub mod history;
pub mod session;

pub use backend::{
    AssistantBackend, HttpAssistantBackend, ThreadMessage, ToolCallReply, ToolCallRequest,
};
pub use history::{ThreadHistoryIndex, ThreadSnapshot};
pub use session::ConversationSession;
