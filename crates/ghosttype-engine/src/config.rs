//! Engine tuning knobs.
use std::time::Duration;

/// Engine configuration. Defaults match the tuned behavior: a fixed (not
/// adaptive) pause keeps completion latency predictable.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Typing pause that triggers a completion attempt.
    pub pause: Duration,
    /// Maximum characters retained in the keystroke buffer.
    pub buffer_cap: usize,
    /// A completion is attempted only when the trimmed buffer is strictly
    /// longer than this.
    pub trigger_min_chars: usize,
    /// Letter that, with Ctrl held, clears all context.
    pub reset_key: char,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pause: Duration::from_millis(700),
            buffer_cap: 1000,
            trigger_min_chars: 4,
            reset_key: 'l',
        }
    }
}
