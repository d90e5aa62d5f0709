//! Draft text and send eligibility.

use tokio::sync::watch;

/// Advisory draft length shown by the character counter.
pub const CHAR_LIMIT: usize = 4000;

const WARNING_THRESHOLD: usize = 3500;
const CRITICAL_THRESHOLD: usize = 3800;

/// How close the draft is to [`CHAR_LIMIT`]. Presentation hint only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CharLimit {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl CharLimit {
    pub fn for_length(length: usize) -> Self {
        if length > CRITICAL_THRESHOLD {
            CharLimit::Critical
        } else if length > WARNING_THRESHOLD {
            CharLimit::Warning
        } else {
            CharLimit::Normal
        }
    }
}

/// Derived composer state published on every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComposerStatus {
    /// Draft length in characters
    pub length: usize,
    pub limit: CharLimit,
    /// Whether a send button bound to this state would be enabled
    pub sendable: bool,
}

impl ComposerStatus {
    /// Counter text, e.g. `"12/4000"`.
    pub fn counter(&self) -> String {
        format!("{}/{}", self.length, CHAR_LIMIT)
    }

    pub fn is_over_limit(&self) -> bool {
        self.length > CHAR_LIMIT
    }
}

/// The unsent draft.
///
/// The length cap is never enforced here: drafts longer than
/// [`CHAR_LIMIT`] are kept whole and stay sendable.
#[derive(Debug)]
pub struct ComposerState {
    text: String,
    busy: bool,
    status: watch::Sender<ComposerStatus>,
}

impl Default for ComposerState {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposerState {
    pub fn new() -> Self {
        let (status, _) = watch::channel(ComposerStatus::default());
        Self {
            text: String::new(),
            busy: false,
            status,
        }
    }

    /// Replace the draft text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.publish();
    }

    /// Reset the draft to empty.
    pub fn clear(&mut self) {
        self.text.clear();
        self.publish();
    }

    /// Mark whether a send is in flight. Driven by the session controller
    /// from the typing indicator.
    pub fn set_busy(&mut self, busy: bool) {
        if self.busy != busy {
            self.busy = busy;
            self.publish();
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Draft with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.text.trim()
    }

    /// Draft length in characters (not bytes).
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Non-blank draft and no send in flight.
    pub fn is_sendable(&self) -> bool {
        !self.trimmed().is_empty() && !self.busy
    }

    /// Current derived state.
    pub fn status(&self) -> ComposerStatus {
        *self.status.borrow()
    }

    /// Receive every future status change.
    pub fn subscribe(&self) -> watch::Receiver<ComposerStatus> {
        self.status.subscribe()
    }

    fn publish(&self) {
        let length = self.len();
        let next = ComposerStatus {
            length,
            limit: CharLimit::for_length(length),
            sendable: self.is_sendable(),
        };
        self.status.send_replace(next);
    }
}
