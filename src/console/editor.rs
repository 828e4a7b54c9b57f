//! Editor Bridge
//!
//! Lifecycle of the temporary structured-editing session: spawn with a seed
//! document, suspend normal line composition, and on completion feed the
//! result back into the [`LineSource`] as if it had been typed.

use std::io::{Read, Write};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::console::error::{ConsoleError, Result};
use crate::console::line_source::LineSource;

/// External structured-editing surface.
///
/// `open` must not block. The editor keeps the handle and calls
/// [`EditorHandle::accept`] or [`EditorHandle::cancel`] when the user is
/// done, possibly before `open` returns.
pub trait StructuredEditor: Send + Sync {
    fn open(
        &self,
        seed: &str,
        handle: EditorHandle,
    );
}

#[derive(Debug, Clone)]
struct Session {
    seed: String,
}

type Slot = Arc<Mutex<Option<Session>>>;

#[derive(Debug)]
struct HandleInner {
    done: AtomicBool,
    seed: String,
    slot: Slot,
    source: LineSource,
}

/// Completion handle for one editor session. Clones share completion state.
#[derive(Debug, Clone)]
pub struct EditorHandle {
    inner: Arc<HandleInner>,
}

impl EditorHandle {
    pub fn seed(&self) -> &str {
        &self.inner.seed
    }

    pub fn is_done(&self) -> bool {
        self.inner.done.load(Ordering::SeqCst)
    }

    /// Finish the session with `text`. Returns `false` if it was already
    /// finished, in which case nothing happens.
    pub fn accept(
        &self,
        text: impl Into<String>,
    ) -> bool {
        self.complete(text.into())
    }

    /// Finish the session with an empty line.
    pub fn cancel(&self) -> bool {
        self.complete(String::new())
    }

    fn complete(
        &self,
        text: String,
    ) -> bool {
        if self.inner.done.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.slot.lock().take();
        debug!(cancelled = text.is_empty(), "editor session closed");
        self.inner.source.deliver(text);
        true
    }
}

/// Editor Bridge
pub struct EditorBridge {
    source: LineSource,
    editor: Arc<dyn StructuredEditor>,
    slot: Slot,
}

impl std::fmt::Debug for EditorBridge {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("EditorBridge")
            .field("session", &*self.slot.lock())
            .finish()
    }
}

impl EditorBridge {
    pub fn new(
        source: LineSource,
        editor: Arc<dyn StructuredEditor>,
    ) -> Self {
        Self {
            source,
            editor,
            slot: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_open(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Open a session seeded with `seed`.
    ///
    /// Fails with [`ConsoleError::EditorBusy`] if one is already open.
    pub fn spawn(
        &self,
        seed: &str,
    ) -> Result<EditorHandle> {
        {
            let mut slot = self.slot.lock();
            if slot.is_some() {
                return Err(ConsoleError::EditorBusy);
            }
            *slot = Some(Session {
                seed: seed.to_string(),
            });
        }

        self.source.suspend();
        debug!(seed = %seed, "editor session opened");

        let handle = EditorHandle {
            inner: Arc::new(HandleInner {
                done: AtomicBool::new(false),
                seed: seed.to_string(),
                slot: Arc::clone(&self.slot),
                source: self.source.clone(),
            }),
        };
        self.editor.open(seed, handle.clone());
        Ok(handle)
    }
}

/// How long an external program waits for the terminal reader to park.
const HANDOFF_TIMEOUT: Duration = Duration::from_secs(1);

/// Hands the terminal from a key-reading thread to an external program.
///
/// The reader reports whether it is parked, meaning it will not read the
/// terminal again until the line source resumes. The program starts only
/// once the reader is parked, so its keystrokes and terminal replies are
/// never consumed by the console.
#[derive(Debug, Default)]
pub struct InputHandoff {
    parked: Mutex<bool>,
    changed: Condvar,
}

impl InputHandoff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_parked(
        &self,
        parked: bool,
    ) {
        let mut state = self.parked.lock();
        if *state != parked {
            *state = parked;
            self.changed.notify_all();
        }
    }

    pub fn is_parked(&self) -> bool {
        *self.parked.lock()
    }

    /// Block until the reader is parked. Returns `false` on timeout.
    pub fn wait_parked(
        &self,
        timeout: Duration,
    ) -> bool {
        let mut parked = self.parked.lock();
        if !*parked {
            self.changed
                .wait_while_for(&mut parked, |parked| !*parked, timeout);
        }
        *parked
    }
}

/// Edits the seed in an external program (`$VISUAL`, `$EDITOR`, or a
/// configured command) through a temporary file.
///
/// The program runs on its own thread. Exit success accepts the file
/// content minus one trailing newline; anything else cancels.
#[derive(Debug, Clone)]
pub struct ExternalEditor {
    command: Option<String>,
    suffix: String,
    raw_mode_handoff: bool,
    input: Option<Arc<InputHandoff>>,
}

impl Default for ExternalEditor {
    fn default() -> Self {
        Self {
            command: None,
            suffix: ".py".to_string(),
            raw_mode_handoff: false,
            input: None,
        }
    }
}

impl ExternalEditor {
    pub fn new(command: Option<String>) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }

    pub fn with_suffix(
        mut self,
        suffix: impl Into<String>,
    ) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Leave terminal raw mode while the program runs.
    pub fn with_raw_mode_handoff(
        mut self,
        enabled: bool,
    ) -> Self {
        self.raw_mode_handoff = enabled;
        self
    }

    /// Wait for the terminal reader to park before the program starts.
    pub fn with_input_handoff(
        mut self,
        handoff: Arc<InputHandoff>,
    ) -> Self {
        self.input = Some(handoff);
        self
    }

    fn program(&self) -> String {
        self.command
            .clone()
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string())
    }

    /// Run the editor to completion. `Ok(None)` means cancelled.
    pub fn edit(
        &self,
        seed: &str,
    ) -> std::io::Result<Option<String>> {
        let mut file = tempfile::Builder::new()
            .prefix("hookline-")
            .suffix(&self.suffix)
            .tempfile()?;
        file.write_all(seed.as_bytes())?;
        file.flush()?;

        let program = self.program();
        let mut parts = program.split_whitespace();
        let Some(bin) = parts.next() else {
            return Ok(None);
        };

        if let Some(input) = &self.input {
            if !input.wait_parked(HANDOFF_TIMEOUT) {
                warn!("terminal reader did not park, starting editor anyway");
            }
        }
        if self.raw_mode_handoff {
            crossterm::terminal::disable_raw_mode()?;
        }
        let status = Command::new(bin).args(parts).arg(file.path()).status();
        if self.raw_mode_handoff {
            crossterm::terminal::enable_raw_mode()?;
        }

        if !status?.success() {
            return Ok(None);
        }

        let mut text = String::new();
        file.reopen()?.read_to_string(&mut text)?;
        if text.ends_with('\n') {
            text.pop();
            if text.ends_with('\r') {
                text.pop();
            }
        }
        Ok(Some(text))
    }
}

impl StructuredEditor for ExternalEditor {
    fn open(
        &self,
        seed: &str,
        handle: EditorHandle,
    ) {
        let editor = self.clone();
        let seed = seed.to_string();
        std::thread::spawn(move || match editor.edit(&seed) {
            Ok(Some(text)) => {
                handle.accept(text);
            }
            Ok(None) => {
                handle.cancel();
            }
            Err(e) => {
                warn!("editor failed: {}", e);
                handle.cancel();
            }
        });
    }
}
