//! Line Source
//!
//! Owns keystroke and paste ingestion, the pending-line queue and the single
//! outstanding read request.
//!
//! A read request is a one-slot `watch` channel. Whoever asks for a line
//! while a request is outstanding subscribes to that same channel, so all
//! of them see the same line.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{watch, Notify};
use tracing::debug;

use crate::console::error::{ConsoleError, Result};
use crate::console::sink::OutputSink;

/// A key event as delivered by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Tab,
    /// Shift, Alt or Control pressed on their own.
    Modifier,
    /// Part of an IME composition sequence.
    Composing,
}

#[derive(Debug, Default)]
struct State {
    /// Line being composed
    current: String,
    /// Completed lines nobody asked for yet
    pending: VecDeque<String>,
    /// Outstanding read request
    request: Option<watch::Sender<Option<String>>>,
    /// Set while an editor session owns the input
    suspended: bool,
    closed: bool,
}

enum Read {
    Ready(String),
    Wait(watch::Receiver<Option<String>>),
    Closed,
}

/// Line Source
///
/// Cheap to clone; clones share state. Key handlers, paste handlers and the
/// editor bridge all hold clones while the driver awaits [`LineSource::next_line`].
#[derive(Clone)]
pub struct LineSource {
    state: Arc<Mutex<State>>,
    requested: Arc<Notify>,
    sink: Arc<dyn OutputSink>,
    indent: String,
}

impl std::fmt::Debug for LineSource {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("LineSource")
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl LineSource {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            requested: Arc::new(Notify::new()),
            sink,
            indent: "    ".to_string(),
        }
    }

    /// Text typed by [`Key::Tab`].
    pub fn with_indent(
        mut self,
        indent: impl Into<String>,
    ) -> Self {
        self.indent = indent.into();
        self
    }

    /// Dispatch one host key event.
    pub fn handle_key(
        &self,
        key: Key,
    ) {
        match key {
            Key::Char(c) => self.type_key(c),
            Key::Tab => {
                let indent = self.indent.clone();
                self.type_text(&indent);
            }
            Key::Enter => {
                if self.is_suspended() {
                    debug!("enter ignored while editor is open");
                    return;
                }
                self.sink.write("\n");
                self.submit();
            }
            Key::Backspace => self.erase(),
            Key::Modifier | Key::Composing => {}
        }
    }

    /// Append one character to the line being composed and echo it.
    pub fn type_key(
        &self,
        key: char,
    ) {
        if key == '\n' || key == '\r' {
            return;
        }
        let mut buf = [0u8; 4];
        self.type_text(key.encode_utf8(&mut buf));
    }

    fn type_text(
        &self,
        text: &str,
    ) {
        let mut state = self.state.lock();
        if state.suspended {
            debug!("keystroke ignored while editor is open");
            return;
        }
        state.current.push_str(text);
        self.sink.write(text);
    }

    /// Remove the last character of the line being composed.
    pub fn erase(&self) {
        let mut state = self.state.lock();
        if state.suspended {
            return;
        }
        if state.current.pop().is_some() {
            self.sink.erase_last();
        }
    }

    /// Ingest pasted text.
    ///
    /// Every segment followed by a line break is echoed and submitted in
    /// order; the trailing segment only extends the line being composed.
    pub fn paste(
        &self,
        text: &str,
    ) {
        let mut state = self.state.lock();
        if state.suspended {
            debug!("paste ignored while editor is open");
            return;
        }

        let normalized = text.replace("\r\n", "\n");
        let mut segments: Vec<&str> = normalized.split('\n').collect();
        let tail = segments.pop().unwrap_or_default();

        for segment in segments {
            state.current.push_str(segment);
            self.sink.write(segment);
            self.sink.write("\n");
            Self::complete(&mut state);
        }

        state.current.push_str(tail);
        self.sink.write(tail);
    }

    /// Complete the line being composed (Enter).
    pub fn submit(&self) {
        let mut state = self.state.lock();
        if state.suspended {
            return;
        }
        Self::complete(&mut state);
    }

    fn complete(state: &mut State) {
        let line = std::mem::take(&mut state.current);
        match Self::take_live_request(state) {
            Some(request) => {
                debug!(line = %line, "resolving read request");
                request.send_replace(Some(line));
            }
            None => {
                debug!(line = %line, queued = state.pending.len() + 1, "queueing line");
                state.pending.push_back(line);
            }
        }
    }

    /// The outstanding request, unless every reader has gone away.
    fn take_live_request(state: &mut State) -> Option<watch::Sender<Option<String>>> {
        let request = state.request.take()?;
        if request.receiver_count() == 0 {
            debug!("read request abandoned");
            return None;
        }
        Some(request)
    }

    /// Ask for the next completed line.
    ///
    /// Bookkeeping happens now, not when the returned future is first
    /// polled: a queued line is dequeued immediately, otherwise the
    /// outstanding request is created or joined.
    pub fn next_line(&self) -> impl Future<Output = Result<String>> + Send + 'static {
        let read = self.begin_read();
        async move {
            match read {
                Read::Ready(line) => Ok(line),
                Read::Closed => Err(ConsoleError::InputClosed),
                Read::Wait(mut rx) => {
                    let line = rx
                        .wait_for(Option::is_some)
                        .await
                        .map_err(|_| ConsoleError::InputClosed)?
                        .as_deref()
                        .unwrap_or_default()
                        .to_string();
                    Ok(line)
                }
            }
        }
    }

    fn begin_read(&self) -> Read {
        let mut state = self.state.lock();

        if !state.suspended {
            if let Some(line) = state.pending.pop_front() {
                return Read::Ready(line);
            }
        }

        if let Some(request) = &state.request {
            return Read::Wait(request.subscribe());
        }

        if state.closed {
            return Read::Closed;
        }

        let (tx, rx) = watch::channel(None);
        state.request = Some(tx);
        self.requested.notify_one();
        Read::Wait(rx)
    }

    /// Wait until a new read request is created. May return spuriously;
    /// re-check [`LineSource::has_outstanding_request`].
    pub async fn request_created(&self) {
        self.requested.notified().await
    }

    /// Hand over input to an editor session.
    pub(crate) fn suspend(&self) {
        self.state.lock().suspended = true;
    }

    /// Deliver the result of an editor session and resume normal input.
    ///
    /// With no outstanding request the text goes to the front of the
    /// queue: it replaces the intercepted line, which preceded every
    /// queued one.
    pub(crate) fn deliver(
        &self,
        text: String,
    ) {
        let mut state = self.state.lock();
        state.suspended = false;
        match Self::take_live_request(&mut state) {
            Some(request) => {
                request.send_replace(Some(text));
            }
            None => state.pending.push_front(text),
        }
    }

    /// End of session. Queued lines can still be read; after that every
    /// read fails with [`ConsoleError::InputClosed`].
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.request = None;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn is_suspended(&self) -> bool {
        self.state.lock().suspended
    }

    pub fn has_outstanding_request(&self) -> bool {
        self.state.lock().request.is_some()
    }

    pub fn current_line(&self) -> String {
        self.state.lock().current.clone()
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn sink(&self) -> &Arc<dyn OutputSink> {
        &self.sink
    }
}
