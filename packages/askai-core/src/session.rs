//! Chat session controller.
//!
//! [`ChatSession`] owns the composer, the pending attachments, the
//! transcript and the typing indicator, and is the only thing that mutates
//! them. A send is split in two so the session does not have to be
//! borrowed while the request is in flight:
//!
//! 1. [`ChatSession::begin_submit`] records the user message, clears the
//!    draft, enters Waiting and hands back a [`PendingSend`].
//! 2. The caller delivers `pending.request()` with a [`ChatTransport`].
//! 3. [`ChatSession::apply_outcome`] returns to Idle and records the reply
//!    or the diagnostic message.
//!
//! Every `PendingSend` carries the session generation it was created in.
//! Starting a new session bumps the generation, so a reply that arrives
//! afterwards is dropped instead of landing in the fresh transcript.

use tokio::sync::watch;

use crate::attachments::{Attachment, AttachmentStore, FileDescriptor, PreviewRegistry};
use crate::client::ChatTransport;
use crate::composer::{ComposerState, ComposerStatus};
use crate::message_log::{MessageLog, Transcript};
use crate::typing::{TypingIndicator, TypingState};
use crate::types::{AttachmentInfo, ChatReply, ChatRequest, Message};
use crate::{Error, NotSendableReason, Result};

/// Assistant text recorded when a send fails for any reason.
pub const SERVER_UNREACHABLE: &str = "Error: Cannot reach server.";

/// Starter prompts offered while the transcript is empty.
pub const WELCOME_SUGGESTIONS: [&str; 4] = [
    "Explain quantum computing",
    "Write a Python function",
    "Plan a trip to Japan",
    "Explain machine learning",
];

/// How a completed send was applied to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The assistant reply was appended
    Replied,
    /// The diagnostic message was appended
    Failed,
    /// The session was reset while waiting; nothing was applied
    Discarded,
}

/// A send that has been committed locally and is waiting for its reply.
///
/// Owns the attachments drained for the message; their preview handles
/// are released when the pending send is consumed.
#[derive(Debug)]
pub struct PendingSend {
    generation: u64,
    request: ChatRequest,
    attachments: Vec<Attachment>,
}

impl PendingSend {
    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

/// One chat session: draft, attachments, transcript and reply state.
#[derive(Debug)]
pub struct ChatSession {
    user_id: String,
    generation: u64,
    composer: ComposerState,
    attachments: AttachmentStore,
    log: MessageLog,
    typing: TypingIndicator,
}

impl ChatSession {
    /// Create a session that identifies itself to the endpoint as `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self::with_registry(user_id, PreviewRegistry::new())
    }

    /// Create a session whose attachment previews come from `previews`.
    pub fn with_registry(user_id: impl Into<String>, previews: PreviewRegistry) -> Self {
        Self {
            user_id: user_id.into(),
            generation: 0,
            composer: ComposerState::new(),
            attachments: AttachmentStore::with_registry(previews),
            log: MessageLog::new(),
            typing: TypingIndicator::new(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ========================================================================
    // Composer
    // ========================================================================

    /// Replace the draft text.
    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.composer.set_text(text);
    }

    pub fn draft(&self) -> &str {
        self.composer.text()
    }

    pub fn composer(&self) -> &ComposerState {
        &self.composer
    }

    pub fn composer_status(&self) -> ComposerStatus {
        self.composer.status()
    }

    /// Receive composer status changes (counter, send button).
    pub fn watch_composer(&self) -> watch::Receiver<ComposerStatus> {
        self.composer.subscribe()
    }

    /// Non-blank draft and no reply pending.
    pub fn is_sendable(&self) -> bool {
        self.composer.is_sendable() && !self.typing.is_waiting()
    }

    /// Put one of [`WELCOME_SUGGESTIONS`] into the draft.
    pub fn apply_suggestion(&mut self, index: usize) -> bool {
        match WELCOME_SUGGESTIONS.get(index) {
            Some(prompt) => {
                self.composer.set_text(*prompt);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Attachments
    // ========================================================================

    /// Stage a file for the next message.
    pub fn attach(&mut self, file: FileDescriptor) -> AttachmentInfo {
        self.attachments.add(file).info()
    }

    /// Unstage a file. Unknown ids are ignored.
    pub fn detach(&mut self, id: &str) -> bool {
        self.attachments.remove(id)
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    // ========================================================================
    // Transcript & Typing
    // ========================================================================

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Transcript {
        self.log.all()
    }

    pub fn typing_state(&self) -> TypingState {
        self.typing.state()
    }

    /// True while nothing has been said in this session.
    pub fn is_welcome(&self) -> bool {
        self.log.is_empty()
    }

    // ========================================================================
    // Send Cycle
    // ========================================================================

    /// Commit the draft locally and enter Waiting.
    ///
    /// Fails with [`Error::NotSendable`] and changes nothing if the draft is
    /// blank or a reply is still pending.
    pub fn begin_submit(&mut self) -> Result<PendingSend> {
        if self.typing.is_waiting() {
            return Err(Error::NotSendable(NotSendableReason::SendInFlight));
        }

        let text = self.composer.trimmed().to_string();
        if text.is_empty() {
            return Err(Error::NotSendable(NotSendableReason::EmptyDraft));
        }

        let attachments = self.attachments.drain();
        let infos = attachments.iter().map(Attachment::info).collect();

        self.log.append(Message::user(text.clone()).with_attachments(infos));
        self.composer.clear();
        self.typing.begin();
        self.composer.set_busy(true);

        tracing::info!(
            generation = self.generation,
            chars = text.chars().count(),
            attachments = attachments.len(),
            "Sending message"
        );

        Ok(PendingSend {
            generation: self.generation,
            request: ChatRequest {
                message: text,
                user_id: self.user_id.clone(),
            },
            attachments,
        })
    }

    /// Apply the result of a pending send.
    ///
    /// Always leaves the typing indicator Idle for a current-generation
    /// send. Errors are logged and replaced in the transcript by
    /// [`SERVER_UNREACHABLE`].
    pub fn apply_outcome(&mut self, pending: PendingSend, outcome: Result<ChatReply>) -> Outcome {
        if pending.generation != self.generation {
            tracing::warn!(
                stale = pending.generation,
                current = self.generation,
                "Discarding reply for a session that was reset"
            );
            return Outcome::Discarded;
        }

        self.typing.end();
        self.composer.set_busy(false);

        match outcome {
            Ok(reply) => {
                tracing::debug!("Received reply ({} chars)", reply.response.chars().count());
                self.log.append(Message::assistant(reply.response));
                Outcome::Replied
            }
            Err(e) => {
                match &e {
                    Error::Network(_) => tracing::error!("Cannot reach chat endpoint: {}", e),
                    Error::Protocol(_) => tracing::error!("Unusable reply from chat endpoint: {}", e),
                    _ => tracing::error!("Chat request failed: {}", e),
                }
                self.log.append(Message::assistant(SERVER_UNREACHABLE));
                Outcome::Failed
            }
        }
    }

    /// Run a full send cycle against `transport`.
    ///
    /// Only precondition failures are returned as errors; transport
    /// failures are folded into the transcript and reported as
    /// [`Outcome::Failed`].
    pub async fn submit<T: ChatTransport + ?Sized>(&mut self, transport: &T) -> Result<Outcome> {
        let pending = self.begin_submit()?;
        let outcome = transport.send(pending.request()).await;
        Ok(self.apply_outcome(pending, outcome))
    }

    /// Return to the welcome state: empty transcript, no attachments,
    /// blank draft, Idle. Any reply still in flight will be discarded.
    pub fn start_new_session(&mut self) {
        self.generation += 1;
        self.log.clear();
        self.attachments.clear();
        self.typing.end();
        self.composer.clear();
        self.composer.set_busy(false);

        tracing::info!(generation = self.generation, "Started new session");
    }
}
