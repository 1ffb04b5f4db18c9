//! Global keyboard hook boundary.
//!
//! Wraps the OS-level hook (`rdev`) behind an engine-facing event model.
//! The hook delivers every keystroke on a single dedicated thread; callers
//! pass a callback to [`listen`] and spawn the thread themselves.
//!
//! The hook cannot tell synthetic events from real ones, so no provenance
//! flag appears on [`KeyEvent`]. Suppression of self-generated input is the
//! caller's job, via the injector's re-entrancy guard checked inside the
//! callback.

use tracing::trace;

mod error;

pub use error::{Error, Result};

/// A key as the engine sees it: printable characters plus the handful of
/// control keys the engine reacts to. Everything else maps to [`Key::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable character, as reported by the OS keyboard layout.
    Char(char),
    /// The space bar.
    Space,
    /// Backspace.
    Backspace,
    /// Return / Enter.
    Enter,
    /// Tab (suggestion accept).
    Tab,
    /// Escape (suggestion reject).
    Escape,
    /// Either Control key.
    Ctrl,
    /// Either Shift key.
    Shift,
    /// Any key the engine has no use for (function keys, arrows, media keys).
    Other,
}

/// Direction of a key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Key pressed.
    Down,
    /// Key released.
    Up,
}

/// A single keyboard event delivered by the global hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Press or release.
    pub kind: EventKind,
    /// The key involved.
    pub key: Key,
}

/// Map a raw hook key to the engine model, using the layout-resolved `name`
/// for printable characters when available.
fn map_key(key: rdev::Key, name: Option<&str>) -> Key {
    match key {
        rdev::Key::ControlLeft | rdev::Key::ControlRight => Key::Ctrl,
        rdev::Key::ShiftLeft | rdev::Key::ShiftRight => Key::Shift,
        rdev::Key::Backspace => Key::Backspace,
        rdev::Key::Return => Key::Enter,
        rdev::Key::Tab => Key::Tab,
        rdev::Key::Escape => Key::Escape,
        rdev::Key::Space => Key::Space,
        _ => {
            // The hook resolves printable keys through the active layout and
            // hands us the produced text; a single non-control char is a
            // typed character, anything else (dead keys, IME chords) is not.
            if let Some(s) = name {
                let mut chars = s.chars();
                if let (Some(c), None) = (chars.next(), chars.next())
                    && !c.is_control()
                {
                    return Key::Char(c);
                }
            }
            // With Ctrl held the layout reports a control character (^L for
            // Ctrl+L); fall back to the physical key so hotkeys still
            // resolve to their letter.
            fallback_char(key).map_or(Key::Other, Key::Char)
        }
    }
}

/// Layout-independent character for the plain letter/digit keys.
fn fallback_char(key: rdev::Key) -> Option<char> {
    use rdev::Key as K;
    let c = match key {
        K::KeyA => 'a',
        K::KeyB => 'b',
        K::KeyC => 'c',
        K::KeyD => 'd',
        K::KeyE => 'e',
        K::KeyF => 'f',
        K::KeyG => 'g',
        K::KeyH => 'h',
        K::KeyI => 'i',
        K::KeyJ => 'j',
        K::KeyK => 'k',
        K::KeyL => 'l',
        K::KeyM => 'm',
        K::KeyN => 'n',
        K::KeyO => 'o',
        K::KeyP => 'p',
        K::KeyQ => 'q',
        K::KeyR => 'r',
        K::KeyS => 's',
        K::KeyT => 't',
        K::KeyU => 'u',
        K::KeyV => 'v',
        K::KeyW => 'w',
        K::KeyX => 'x',
        K::KeyY => 'y',
        K::KeyZ => 'z',
        K::Num0 => '0',
        K::Num1 => '1',
        K::Num2 => '2',
        K::Num3 => '3',
        K::Num4 => '4',
        K::Num5 => '5',
        K::Num6 => '6',
        K::Num7 => '7',
        K::Num8 => '8',
        K::Num9 => '9',
        _ => return None,
    };
    Some(c)
}

/// Translate a raw hook event. Returns `None` for non-keyboard events
/// (mouse motion, wheel) which the hook also reports.
pub fn map_event(ev: &rdev::Event) -> Option<KeyEvent> {
    match ev.event_type {
        rdev::EventType::KeyPress(k) => Some(KeyEvent {
            kind: EventKind::Down,
            key: map_key(k, ev.name.as_deref()),
        }),
        rdev::EventType::KeyRelease(k) => Some(KeyEvent {
            kind: EventKind::Up,
            // Release events carry no produced text; specials still map.
            key: map_key(k, None),
        }),
        _ => None,
    }
}

/// Run the global hook loop, invoking `on_event` for every keyboard event.
///
/// Blocks for the life of the hook; spawn a dedicated thread for it. The
/// callback runs on that thread and must not block, or keystroke delivery
/// to the rest of the system stalls.
pub fn listen<F>(mut on_event: F) -> Result<()>
where
    F: FnMut(KeyEvent) + Send + 'static,
{
    trace!("starting_global_hook");
    rdev::listen(move |ev| {
        if let Some(mapped) = map_event(&ev) {
            on_event(mapped);
        }
    })
    .map_err(Error::from_listen)
}
