use serde::{Deserialize, Serialize};

use crate::core::config::defaults::CONTEXT_HEADER;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Roles kept in the history window.
    pub fn is_dialogue(&self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }
}

/// A role-tagged message, shaped like an OpenAI chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// System message carrying retrieved context, or `None` when there is none.
    pub fn context(context: &str) -> Option<Self> {
        let context = context.trim();
        if context.is_empty() {
            return None;
        }
        Some(Self::system(format!("{}\n{}", CONTEXT_HEADER, context)))
    }
}
