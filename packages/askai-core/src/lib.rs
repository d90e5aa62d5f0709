//! ASK.AI Core - conversation state and request lifecycle for the chat client.
//!
//! This crate holds everything the chat front end needs that is not
//! presentation:
//!
//! - **Composer**: draft text, character counter, send eligibility
//! - **Attachments**: files staged for the next outgoing message
//! - **Message log**: the append-only session transcript
//! - **Typing indicator**: the Idle/Waiting reply state machine
//! - **Session**: the controller tying the above to the chat endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use askai_core::{ChatClient, ChatSession, ClientConfig};
//!
//! # async fn run() -> askai_core::Result<()> {
//! let config = ClientConfig::load()?;
//! let client = ChatClient::new(&config)?;
//! let mut session = ChatSession::new(config.user_id.clone());
//!
//! session.set_draft("Hello");
//! let outcome = session.submit(&client).await?;
//! println!("{:?}: {}", outcome, session.transcript().len());
//! # Ok(())
//! # }
//! ```

pub mod attachments;
pub mod client;
pub mod composer;
pub mod config;
pub mod message_log;
pub mod session;
pub mod typing;
pub mod types;

// Re-export commonly used types
pub use attachments::{Attachment, AttachmentStore, FileDescriptor, PreviewHandle, PreviewRegistry};
pub use client::{ChatClient, ChatTransport};
pub use composer::{CharLimit, ComposerState, ComposerStatus, CHAR_LIMIT};
pub use config::ClientConfig;
pub use message_log::{MessageLog, Transcript};
pub use session::{ChatSession, Outcome, PendingSend, SERVER_UNREACHABLE, WELCOME_SUGGESTIONS};
pub use typing::{TypingIndicator, TypingState};
pub use types::{AttachmentInfo, AttachmentKind, ChatReply, ChatRequest, HealthStatus, Message, Sender};

/// Why a submit was rejected before anything was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotSendableReason {
    /// The draft is empty after trimming.
    EmptyDraft,
    /// A previous send has not completed yet.
    SendInFlight,
}

impl std::fmt::Display for NotSendableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotSendableReason::EmptyDraft => write!(f, "draft is empty"),
            NotSendableReason::SendInFlight => write!(f, "a reply is still pending"),
        }
    }
}

/// Error types for askai-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not sendable: {0}")]
    NotSendable(NotSendableReason),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("HTTP client setup failed: {0}")]
    ClientBuild(String),

    #[error("Attachment error: {0}")]
    Attachment(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// Whether this error belongs to the send path (endpoint unreachable or
    /// answered with something unusable).
    pub fn is_send_failure(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Protocol(_))
    }
}

/// Result type for askai-core operations.
pub type Result<T> = std::result::Result<T, Error>;
