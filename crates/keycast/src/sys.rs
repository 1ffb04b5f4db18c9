//! OS-backed sink using the `enigo` input synthesizer.
use enigo::{Direction, Enigo, Key, Keyboard, Settings};

use crate::{Error, Result, Sink, SynthKey};

/// Production [`Sink`] posting events through the platform input APIs.
pub struct EnigoSink {
    enigo: Enigo,
}

impl EnigoSink {
    /// Open a connection to the OS input synthesizer.
    pub fn new() -> Result<Self> {
        let enigo =
            Enigo::new(&Settings::default()).map_err(|e| Error::Connect(e.to_string()))?;
        Ok(Self { enigo })
    }

    fn click(&mut self, key: Key) -> Result<()> {
        self.enigo
            .key(key, Direction::Click)
            .map_err(|e| Error::Emit(e.to_string()))
    }
}

impl Sink for EnigoSink {
    fn send(&mut self, key: SynthKey) -> Result<()> {
        match key {
            SynthKey::Char(c) => self.click(Key::Unicode(c)),
            SynthKey::Backspace => self.click(Key::Backspace),
            SynthKey::Right => self.click(Key::RightArrow),
            SynthKey::SelectLeft => {
                self.enigo
                    .key(Key::Shift, Direction::Press)
                    .map_err(|e| Error::Emit(e.to_string()))?;
                // Release Shift even if the arrow click fails; a held
                // synthetic Shift would garble all subsequent user input.
                let click = self.click(Key::LeftArrow);
                let release = self
                    .enigo
                    .key(Key::Shift, Direction::Release)
                    .map_err(|e| Error::Emit(e.to_string()));
                click.and(release)
            }
        }
    }
}
