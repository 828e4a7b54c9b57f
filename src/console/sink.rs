//! Output sinks
//!
//! The transcript the user sees. Echoed keystrokes, prompts, printed values
//! and user errors all go through an [`OutputSink`].

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::{queue, style::Print};
use parking_lot::Mutex;

/// Cursor glyph appended by [`Transcript::display`].
pub const CURSOR: char = '■';

pub trait OutputSink: Send + Sync {
    /// Append `text` to the transcript.
    fn write(
        &self,
        text: &str,
    );

    /// Remove the last visible character.
    fn erase_last(&self);
}

impl<S: OutputSink + ?Sized> OutputSink for Arc<S> {
    fn write(
        &self,
        text: &str,
    ) {
        (**self).write(text)
    }

    fn erase_last(&self) {
        (**self).erase_last()
    }
}

/// In-memory transcript. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    buffer: Arc<Mutex<String>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.buffer.lock().clone()
    }

    /// Transcript followed by the cursor glyph.
    pub fn display(&self) -> String {
        let mut text = self.text();
        text.push(CURSOR);
        text
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

impl OutputSink for Transcript {
    fn write(
        &self,
        text: &str,
    ) {
        self.buffer.lock().push_str(text);
    }

    fn erase_last(&self) {
        self.buffer.lock().pop();
    }
}

/// Writes straight to stdout. In raw mode line breaks are emitted as
/// `\r\n`.
#[derive(Debug, Default)]
pub struct TerminalSink {
    raw: bool,
    lock: Mutex<()>,
}

impl TerminalSink {
    /// For a terminal in raw mode.
    pub fn raw() -> Self {
        Self {
            raw: true,
            lock: Mutex::new(()),
        }
    }

    /// For piped or cooked output.
    pub fn plain() -> Self {
        Self::default()
    }

    fn emit(
        &self,
        text: &str,
    ) -> io::Result<()> {
        let _guard = self.lock.lock();
        let mut stdout = io::stdout();
        if self.raw {
            queue!(stdout, Print(text.replace('\n', "\r\n")))?;
        } else {
            queue!(stdout, Print(text))?;
        }
        stdout.flush()
    }
}

impl OutputSink for TerminalSink {
    fn write(
        &self,
        text: &str,
    ) {
        if let Err(e) = self.emit(text) {
            tracing::warn!("terminal write failed: {}", e);
        }
    }

    fn erase_last(&self) {
        if let Err(e) = self.emit("\x08 \x08") {
            tracing::warn!("terminal write failed: {}", e);
        }
    }
}
