//! Shared data types for deliberations and service clients

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name used in chat-style API payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of conversation context.
///
/// Turns accumulate over a single deliberation so that later synthesis calls
/// hear the earlier speakers; they are never persisted beyond the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Reference material for voice cloning: a sample recording plus the
/// transcript of that recording (tagged with the member's speaker tag).
#[derive(Debug, Clone)]
pub struct RefVoice {
    pub audio_path: PathBuf,
    pub transcript: String,
}
