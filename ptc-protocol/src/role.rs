//! Message roles and the wire message shape.

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation with the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// A user-authored message (here: the compressed turn history).
    User,
    /// An LLM-authored message.
    Assistant,
}

/// A single message. The compression strategy (C8) always emits
/// exactly `[Message{role: System, ..}, Message{role: User, ..}]`;
/// assistant messages only appear in the collected conversation trace
/// when an agent run is configured with `collect_messages`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Who "said" this message.
    pub role: Role,
    /// Plain-text content.
    pub content: String,
}

impl Message {
    /// Build a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// Build a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Build an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
