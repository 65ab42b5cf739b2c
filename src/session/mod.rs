//! Conversation sessions: per-tenant dialogue state, prompt assembly and the
//! bounded registry that owns them.

mod conversation;
mod prompt;
mod registry;

pub use conversation::{ConversationSession, HistoryEntry, SessionState};
pub use prompt::{PromptMessage, Role};
pub use registry::{SessionRegistry, SharedSession};
