//! Core data types for the chat client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Transcript Types
// ============================================================================

/// Who wrote a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Short avatar label shown next to a message.
    pub fn label(&self) -> &'static str {
        match self {
            Sender::User => "U",
            Sender::Assistant => "AI",
        }
    }
}

/// One entry in the transcript.
///
/// Messages are never edited once appended to a [`MessageLog`](crate::MessageLog);
/// the log only ever grows until the session is reset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Text body. Assistant text may carry inline emphasis markup.
    pub content: String,
    pub sender: Sender,
    /// Assigned when the message is appended to the log
    pub timestamp: DateTime<Utc>,
    /// Files that accompanied a user message, for display only
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<AttachmentInfo>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::User,
            timestamp: Utc::now(),
            attachments: Vec::new(),
        }
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sender: Sender::Assistant,
            timestamp: Utc::now(),
            attachments: Vec::new(),
        }
    }

    /// Record attachment metadata on the message.
    pub fn with_attachments(mut self, attachments: Vec<AttachmentInfo>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Broad category of an attachment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    #[default]
    File,
}

/// Display metadata of an attachment, detached from its content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AttachmentInfo {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub kind: AttachmentKind,
}

// ============================================================================
// Wire Types
// ============================================================================

/// Body of a POST to the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
}

/// Body returned by the chat endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Body returned by the backend health route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
