//! Per-tenant conversation state and prompt assembly.
//!
//! A session is `Fresh` until its first prompt is formatted and `Active`
//! afterwards. Switching namespace is the only way back to `Fresh`: the
//! history is dropped and a new thread id is issued.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::prompt::{PromptMessage, Role};
use crate::core::config::defaults::{MAX_HISTORY_PAIRS, SYSTEM_PROMPT};
use crate::rag::ContextProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Read-only snapshot for caller bookkeeping such as lead capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub thread_id: String,
    pub is_first_interaction: bool,
    pub initial_question: Option<String>,
    pub message_count: usize,
    pub current_namespace: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    thread_id: String,
    current_namespace: Option<String>,
    history: Vec<HistoryEntry>,
    /// Window size in user/assistant pairs.
    max_history: usize,
    is_first_interaction: bool,
    initial_question: Option<String>,
    system_prompt: String,
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new(MAX_HISTORY_PAIRS)
    }
}

impl ConversationSession {
    pub fn new(max_history: usize) -> Self {
        Self::with_thread_id(new_thread_id(), max_history)
    }

    pub fn with_thread_id(thread_id: impl Into<String>, max_history: usize) -> Self {
        Self {
            thread_id: thread_id.into(),
            current_namespace: None,
            history: Vec::new(),
            max_history: max_history.max(1),
            is_first_interaction: true,
            initial_question: None,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn current_namespace(&self) -> Option<&str> {
        self.current_namespace.as_deref()
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Builds the message list for the next model call.
    ///
    /// A namespace different from the current one resets the session first.
    /// Context is looked up only when a namespace is given and is left out
    /// when the lookup finds nothing.
    pub async fn format_prompt(
        &mut self,
        user_message: &str,
        namespace: Option<&str>,
        context: &dyn ContextProvider,
    ) -> Vec<PromptMessage> {
        if let Some(namespace) = namespace {
            self.switch_namespace(namespace);
        }
        self.note_first_question(user_message);

        let grounding = match namespace {
            Some(namespace) => context.get_context(namespace, user_message).await,
            None => String::new(),
        };
        self.assemble(user_message, &grounding)
    }

    /// Like [`format_prompt`](Self::format_prompt) with caller-supplied context
    /// and no namespace switch.
    pub fn format_prompt_with_context(&mut self, user_message: &str, context: &str) -> Vec<PromptMessage> {
        self.note_first_question(user_message);
        self.assemble(user_message, context)
    }

    /// Appends to the history, then trims it to the newest `max_history` pairs.
    pub fn add_exchange(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(HistoryEntry {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });

        let limit = self.max_history * 2;
        if self.history.len() > limit {
            self.history.retain(|entry| entry.role.is_dialogue());
            let excess = self.history.len().saturating_sub(limit);
            self.history.drain(..excess);
        }
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.thread_id = new_thread_id();
        self.is_first_interaction = true;
        self.initial_question = None;
        tracing::debug!("Session reset, new thread {}", self.thread_id);
    }

    pub fn state(&self) -> SessionState {
        SessionState {
            thread_id: self.thread_id.clone(),
            is_first_interaction: self.is_first_interaction,
            initial_question: self.initial_question.clone(),
            message_count: self.history.len(),
            current_namespace: self.current_namespace.clone(),
        }
    }

    fn switch_namespace(&mut self, namespace: &str) {
        if self.current_namespace.as_deref() == Some(namespace) {
            return;
        }
        // Binding the first namespace to an untouched session keeps its thread id.
        let pristine =
            self.current_namespace.is_none() && self.history.is_empty() && self.is_first_interaction;
        if !pristine {
            tracing::info!(
                "Namespace changed from '{}' to '{}', resetting thread {}",
                self.current_namespace.as_deref().unwrap_or("<none>"),
                namespace,
                self.thread_id
            );
            self.reset();
        }
        self.current_namespace = Some(namespace.to_string());
    }

    fn note_first_question(&mut self, user_message: &str) {
        if self.is_first_interaction {
            self.initial_question = Some(user_message.to_string());
            self.is_first_interaction = false;
        }
    }

    fn assemble(&self, user_message: &str, context: &str) -> Vec<PromptMessage> {
        let mut messages = vec![PromptMessage::system(self.system_prompt.clone())];
        messages.extend(PromptMessage::context(context));

        let window: Vec<&HistoryEntry> = self
            .history
            .iter()
            .filter(|entry| entry.role.is_dialogue())
            .collect();
        let skip = window.len().saturating_sub(self.max_history * 2);
        messages.extend(
            window
                .into_iter()
                .skip(skip)
                .map(|entry| PromptMessage::new(entry.role, entry.content.clone())),
        );

        messages.push(PromptMessage::user(user_message));

        tracing::debug!(
            "Prompt for thread {}: {}",
            self.thread_id,
            serde_json::to_string(&messages).unwrap_or_default()
        );
        messages
    }
}

fn new_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Returns canned context and records what was asked.
    struct StubContext {
        reply: String,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl StubContext {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ContextProvider for StubContext {
        async fn get_context(&self, namespace: &str, query: &str) -> String {
            self.calls
                .lock()
                .unwrap()
                .push((namespace.to_string(), query.to_string()));
            self.reply.clone()
        }
    }

    fn roles(messages: &[PromptMessage]) -> Vec<Role> {
        messages.iter().map(|m| m.role).collect()
    }

    #[tokio::test]
    async fn first_prompt_has_system_context_and_user() {
        let mut session = ConversationSession::default();
        let context = StubContext::new("We open at nine.");

        let messages = session.format_prompt("When do you open?", Some("acme-01"), &context).await;

        assert_eq!(roles(&messages), vec![Role::System, Role::System, Role::User]);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
        assert!(messages[1].content.ends_with("We open at nine."));
        assert_eq!(messages[2].content, "When do you open?");

        let state = session.state();
        assert!(!state.is_first_interaction);
        assert_eq!(state.initial_question.as_deref(), Some("When do you open?"));
        assert_eq!(state.current_namespace.as_deref(), Some("acme-01"));
        assert_eq!(state.message_count, 0);
    }

    #[tokio::test]
    async fn empty_context_is_omitted() {
        let mut session = ConversationSession::default();
        let messages = session
            .format_prompt("hello", Some("acme-01"), &StubContext::new(""))
            .await;
        assert_eq!(roles(&messages), vec![Role::System, Role::User]);
    }

    #[tokio::test]
    async fn no_namespace_means_no_lookup() {
        let mut session = ConversationSession::default();
        let context = StubContext::new("unused");
        let messages = session.format_prompt("hello", None, &context).await;

        assert_eq!(roles(&messages), vec![Role::System, Role::User]);
        assert!(context.calls.lock().unwrap().is_empty());
        assert_eq!(session.current_namespace(), None);
    }

    #[tokio::test]
    async fn initial_question_is_only_the_first() {
        let mut session = ConversationSession::default();
        let context = StubContext::new("");
        session.format_prompt("first", Some("ns"), &context).await;
        session.format_prompt("second", Some("ns"), &context).await;
        assert_eq!(session.state().initial_question.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn namespace_switch_discards_history_and_thread() {
        let mut session = ConversationSession::default();
        let context = StubContext::new("");

        session.format_prompt("hi", Some("A"), &context).await;
        session.add_exchange(Role::User, "hi");
        session.add_exchange(Role::Assistant, "hello from A");
        let thread_a = session.thread_id().to_string();

        session.format_prompt("hi again", Some("B"), &context).await;
        assert!(session.history().is_empty());
        assert_ne!(session.thread_id(), thread_a);
        assert_eq!(session.state().initial_question.as_deref(), Some("hi again"));

        session.add_exchange(Role::User, "hi again");
        session.add_exchange(Role::Assistant, "hello from B");
        let contents: Vec<&str> = session.history().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["hi again", "hello from B"]);
    }

    #[tokio::test]
    async fn first_namespace_keeps_supplied_thread() {
        let mut session = ConversationSession::with_thread_id("thread-42", 5);
        session.format_prompt("hi", Some("A"), &StubContext::new("")).await;
        assert_eq!(session.thread_id(), "thread-42");
        assert_eq!(session.current_namespace(), Some("A"));
    }

    #[tokio::test]
    async fn binding_namespace_after_unscoped_prompt_resets() {
        let mut session = ConversationSession::with_thread_id("t-0", 5);
        let context = StubContext::new("");
        session.format_prompt("first without ns", None, &context).await;

        session.format_prompt("hi", Some("A"), &context).await;
        let state = session.state();
        assert_ne!(state.thread_id, "t-0");
        assert_eq!(state.initial_question.as_deref(), Some("hi"));
        assert!(!state.is_first_interaction);
        assert_eq!(state.current_namespace.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn same_namespace_keeps_thread() {
        let mut session = ConversationSession::default();
        let context = StubContext::new("");
        session.format_prompt("one", Some("A"), &context).await;
        let thread = session.thread_id().to_string();
        session.add_exchange(Role::User, "one");
        session.format_prompt("two", Some("A"), &context).await;

        assert_eq!(session.thread_id(), thread);
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn history_window_keeps_newest_pairs() {
        let mut session = ConversationSession::new(2);
        for turn in 0..5 {
            session.add_exchange(Role::User, format!("q{}", turn));
            session.add_exchange(Role::Assistant, format!("a{}", turn));
        }

        let contents: Vec<&str> = session.history().iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["q3", "a3", "q4", "a4"]);

        let messages = session.format_prompt_with_context("q5", "");
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[1..], ["q3", "a3", "q4", "a4", "q5"]);
    }

    #[test]
    fn trimming_drops_non_dialogue_entries() {
        let mut session = ConversationSession::new(1);
        session.add_exchange(Role::System, "note");
        session.add_exchange(Role::User, "q");
        session.add_exchange(Role::Assistant, "a");

        assert_eq!(session.history().len(), 2);
        assert!(session.history().iter().all(|e| e.role.is_dialogue()));
    }

    #[test]
    fn explicit_context_is_used_verbatim() {
        let mut session = ConversationSession::default().with_system_prompt("Be brief.");
        let messages = session.format_prompt_with_context("price?", "Basic plan: $10");

        assert_eq!(messages[0].content, "Be brief.");
        assert_eq!(messages[1].content, "Context for this question:\nBasic plan: $10");
        assert_eq!(messages[2], PromptMessage::user("price?"));
    }

    #[test]
    fn reset_returns_to_fresh() {
        let mut session = ConversationSession::with_thread_id("thread-1", 5);
        session.format_prompt_with_context("hello", "");
        session.add_exchange(Role::User, "hello");
        session.reset();

        let state = session.state();
        assert_ne!(state.thread_id, "thread-1");
        assert!(state.is_first_interaction);
        assert_eq!(state.initial_question, None);
        assert_eq!(state.message_count, 0);
    }
}
