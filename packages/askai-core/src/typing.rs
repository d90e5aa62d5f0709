//! "Assistant is composing a reply" state machine.

use chrono::{DateTime, Utc};

/// Typing indicator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TypingState {
    #[default]
    Idle,
    Waiting,
}

/// Single-slot indicator reused for the whole session.
///
/// Idle -> Waiting when a send is issued, Waiting -> Idle when its outcome
/// arrives. There is no terminal state.
#[derive(Debug, Clone, Default)]
pub struct TypingIndicator {
    state: TypingState,
    since: Option<DateTime<Utc>>,
}

impl TypingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TypingState {
        self.state
    }

    pub fn is_waiting(&self) -> bool {
        self.state == TypingState::Waiting
    }

    /// When the current Waiting period started.
    pub fn waiting_since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    /// Enter Waiting. Returns `false` and leaves the state untouched if a
    /// Waiting period is already open.
    pub fn begin(&mut self) -> bool {
        if self.is_waiting() {
            tracing::warn!("Typing indicator already waiting; ignoring begin()");
            return false;
        }

        self.state = TypingState::Waiting;
        self.since = Some(Utc::now());
        tracing::debug!("Typing indicator: Idle -> Waiting");
        true
    }

    /// Return to Idle. Harmless when already Idle.
    pub fn end(&mut self) {
        if let Some(since) = self.since.take() {
            let elapsed = Utc::now() - since;
            tracing::debug!(
                elapsed_ms = elapsed.num_milliseconds(),
                "Typing indicator: Waiting -> Idle"
            );
        }
        self.state = TypingState::Idle;
    }
}
