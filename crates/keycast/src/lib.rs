//! Emits synthetic keystrokes into the focused application.
//!
//! An [`Injector`] renders a suggestion by typing its characters and then
//! selecting them (one Shift+Left per character), removes one with an equal
//! run of backspaces, and accepts one with a single Right-arrow that
//! collapses the selection.
//!
//! Every operation holds the [`InjectGuard`] for its full duration. The
//! global hook cannot distinguish our events from the user's, so the guard
//! is the only signal the dispatch layer has for ignoring self-generated
//! input; it is cleared by an RAII scope on every exit path, errors
//! included.
#![warn(missing_docs)]

use std::{sync::Arc, thread, time::Duration};

use parking_lot::Mutex;
use tracing::{debug, trace};

mod error;
mod guard;
mod sys;

pub use error::{Error, Result};
pub use guard::{GuardScope, InjectGuard};
pub use sys::EnigoSink;

/// A single synthetic keystroke the injector knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthKey {
    /// Type one character.
    Char(char),
    /// Delete one character to the left.
    Backspace,
    /// Extend the selection one character to the left (Shift+Left).
    SelectLeft,
    /// Move right, collapsing any selection to its end.
    Right,
}

/// Where synthetic keystrokes go. Production uses [`EnigoSink`]; tests
/// substitute recording or failing sinks.
pub trait Sink: Send {
    /// Emit one keystroke (a full press/release pair).
    fn send(&mut self, key: SynthKey) -> Result<()>;
}

/// Paced synthetic-keystroke injector.
///
/// Receiving applications process input at human rates; a small fixed delay
/// between events keeps them from dropping or reordering our bursts. There
/// is no other backpressure mechanism.
pub struct Injector {
    sink: Mutex<Box<dyn Sink>>,
    guard: InjectGuard,
    pace: Duration,
}

impl Injector {
    /// Create an injector over an arbitrary sink, pacing `pace` between
    /// consecutive events.
    pub fn new(sink: Box<dyn Sink>, pace: Duration) -> Self {
        Self {
            sink: Mutex::new(sink),
            guard: InjectGuard::new(),
            pace,
        }
    }

    /// Create an injector backed by the OS input synthesizer.
    pub fn with_os_sink(pace: Duration) -> Result<Self> {
        Ok(Self::new(Box::new(EnigoSink::new()?), pace))
    }

    /// Handle to the re-entrancy guard, for the dispatch boundary to check.
    pub fn guard(&self) -> InjectGuard {
        self.guard.clone()
    }

    /// Type `text` and leave it selected (Shift+Left once per character).
    ///
    /// The selection is what lets ordinary typing overwrite the suggestion
    /// without an explicit removal step.
    pub fn render(&self, text: &str) -> Result<()> {
        let _scope = self.guard.enter();
        let mut sink = self.sink.lock();
        let mut count = 0usize;
        for c in text.chars() {
            sink.send(SynthKey::Char(c))?;
            self.pace();
            count += 1;
        }
        for _ in 0..count {
            sink.send(SynthKey::SelectLeft)?;
            self.pace();
        }
        debug!(chars = count, "rendered_suggestion");
        Ok(())
    }

    /// Erase a rendered suggestion of `len` characters with backspaces.
    pub fn remove(&self, len: usize) -> Result<()> {
        let _scope = self.guard.enter();
        let mut sink = self.sink.lock();
        for _ in 0..len {
            sink.send(SynthKey::Backspace)?;
            self.pace();
        }
        debug!(chars = len, "removed_suggestion");
        Ok(())
    }

    /// Collapse the selection to its end, committing the rendered text.
    pub fn accept(&self) -> Result<()> {
        let _scope = self.guard.enter();
        self.sink.lock().send(SynthKey::Right)?;
        trace!("accepted_suggestion");
        Ok(())
    }

    fn pace(&self) {
        if !self.pace.is_zero() {
            thread::sleep(self.pace);
        }
    }
}

/// Recording sink capturing every emitted key, shared with the test body.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<SynthKey>>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingSink {
    /// Create an empty recording sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All keys emitted so far, in order.
    pub fn sent(&self) -> Vec<SynthKey> {
        self.sent.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Sink for RecordingSink {
    fn send(&mut self, key: SynthKey) -> Result<()> {
        self.sent.lock().push(key);
        Ok(())
    }
}
