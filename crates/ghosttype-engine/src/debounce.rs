//! Single-shot pause timer feeding the engine's command channel.
//!
//! Typing is bursty; every qualifying keystroke re-arms the timer and only
//! a full pause lets it fire. Arming always cancels the previous timer, so
//! at most one is live. The fire is delivered as [`Cmd::PauseElapsed`]
//! tagged with the arm sequence; the engine ignores fires whose sequence is
//! no longer current, closing the race where an old timer fires while its
//! replacement is being armed.
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::Cmd;

/// Debounce scheduler owned by the engine actor.
pub struct Debounce {
    tx: UnboundedSender<Cmd>,
    delay: Duration,
    seq: u64,
    live: Option<CancellationToken>,
}

impl Debounce {
    /// Create a scheduler firing into `tx` after `delay` of inactivity.
    pub fn new(delay: Duration, tx: UnboundedSender<Cmd>) -> Self {
        Self {
            tx,
            delay,
            seq: 0,
            live: None,
        }
    }

    /// Arm the timer, cancelling any previously armed one.
    pub fn arm(&mut self) {
        self.cancel();
        self.seq += 1;
        let seq = self.seq;
        let token = CancellationToken::new();
        self.live = Some(token.clone());
        let tx = self.tx.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(seq, "debounce_cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    trace!(seq, "debounce_fired");
                    let _ = tx.send(Cmd::PauseElapsed { seq });
                }
            }
        });
    }

    /// Cancel the live timer, if any. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(token) = self.live.take() {
            token.cancel();
        }
    }

    /// Sequence number of the most recent arm; a fire tagged with anything
    /// older is stale.
    pub fn current_seq(&self) -> u64 {
        self.seq
    }

    /// True while a timer is armed (it may have been cancelled but not yet
    /// observed; the sequence check is authoritative).
    pub fn is_armed(&self) -> bool {
        self.live.is_some()
    }
}
