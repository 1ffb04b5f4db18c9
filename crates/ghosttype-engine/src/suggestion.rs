//! Suggestion lifecycle state.
//!
//! At most one suggestion exists at any time, owned exclusively by the
//! engine actor. `Pending` carries the generation of its in-flight request;
//! any qualifying keystroke or reset bumps the engine's generation counter,
//! so a completion landing afterwards is recognized as stale and discarded.

/// Lifecycle of the single candidate suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestion {
    /// No suggestion; the only state from which a request may start.
    Idle,
    /// A completion request is in flight; nothing is rendered yet.
    Pending {
        /// Generation of the request this state belongs to.
        generation: u64,
    },
    /// A suggestion is rendered (typed and left selected) on screen.
    Active {
        /// The rendered candidate text.
        text: String,
    },
}

impl Suggestion {
    /// True if no request is in flight and nothing is rendered.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Rendered text, if a suggestion is active.
    pub fn active_text(&self) -> Option<&str> {
        match self {
            Self::Active { text } => Some(text),
            _ => None,
        }
    }
}
