//! Clipboard access.

use std::time::Duration;

use thiserror::Error;

use crate::prelude::*;

/// A failed clipboard write.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ClipboardError(String);

/// Somewhere we can put text for the user to paste.
pub trait Clipboard {
    /// Replace the clipboard contents with `text`.
    fn set_text(&mut self, text: String) -> Result<(), ClipboardError>;
}

/// The system clipboard, via [`arboard`].
///
/// We open the clipboard on first use, so that a headless machine only fails
/// when somebody actually tries to copy.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,

    /// How long to keep serving copied text after writing it. On X11 and
    /// Wayland, the clipboard is emptied as soon as its owner exits, unless a
    /// clipboard manager has taken it over.
    hold: Option<Duration>,
}

impl SystemClipboard {
    /// A clipboard for a process which exits right after copying. Each write
    /// blocks for up to `hold`, or until another program takes ownership of
    /// the clipboard.
    pub fn holding(hold: Duration) -> Self {
        Self {
            inner: None,
            hold: Some(hold),
        }
    }
}

impl Clipboard for SystemClipboard {
    fn set_text(&mut self, text: String) -> Result<(), ClipboardError> {
        let hold = self.hold;
        let clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => arboard::Clipboard::new().map_err(|err| {
                warn!(error = %err, "Failed to open clipboard");
                ClipboardError(err.to_string())
            })?,
        };
        write_text(self.inner.insert(clipboard), text, hold).map_err(|err| {
            warn!(error = %err, "Failed to write clipboard");
            ClipboardError(err.to_string())
        })
    }
}

/// Write `text`, serving it until `hold` expires or somebody else copies.
#[cfg(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
))]
fn write_text(
    clipboard: &mut arboard::Clipboard,
    text: String,
    hold: Option<Duration>,
) -> Result<(), arboard::Error> {
    use arboard::SetExtLinux as _;

    match hold {
        Some(hold) => {
            info!(
                seconds = hold.as_secs(),
                "Keeping clipboard contents available until another program takes them over"
            );
            clipboard
                .set()
                .wait_until(std::time::Instant::now() + hold)
                .text(text)
        }
        None => clipboard.set_text(text),
    }
}

/// Write `text`. Other platforms keep clipboard contents after we exit.
#[cfg(not(all(
    unix,
    not(any(target_os = "macos", target_os = "android", target_os = "emscripten"))
)))]
fn write_text(
    clipboard: &mut arboard::Clipboard,
    text: String,
    _hold: Option<Duration>,
) -> Result<(), arboard::Error> {
    clipboard.set_text(text)
}

/// An in-memory clipboard for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    /// The last text written.
    pub text: Option<String>,

    /// Should writes fail?
    pub fail: bool,
}

#[cfg(test)]
impl MemoryClipboard {
    /// A clipboard where every write fails.
    pub fn unavailable() -> Self {
        Self {
            text: None,
            fail: true,
        }
    }
}

#[cfg(test)]
impl Clipboard for MemoryClipboard {
    fn set_text(&mut self, text: String) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError("clipboard unavailable".to_owned()));
        }
        self.text = Some(text);
        Ok(())
    }
}
