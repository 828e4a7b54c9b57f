//! Terminal host
//!
//! Raw mode with bracketed paste. A blocking reader thread turns crossterm
//! events into [`Key`] and paste calls on the line source. While an editor
//! session owns the terminal the reader parks, and the external program
//! only starts once it has.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use crossterm::event::{
    self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers,
};
use crossterm::{execute, terminal};
use owo_colors::OwoColorize;
use tracing::{debug, warn};

use crate::console::{ExternalEditor, InputHandoff, Key, LineSource, OutputSink, TerminalSink};
use crate::host::{build_session, SessionOptions};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What the reader should do with one key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Key(Key),
    Quit,
    Ignore,
}

/// Map a crossterm key event onto the console's key model.
pub fn map_key(event: &KeyEvent) -> KeyAction {
    if event.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }
    let control = event.modifiers.contains(KeyModifiers::CONTROL);
    match event.code {
        KeyCode::Char('c') | KeyCode::Char('d') if control => KeyAction::Quit,
        KeyCode::Char(_) if control => KeyAction::Ignore,
        KeyCode::Char(c) => KeyAction::Key(Key::Char(c)),
        KeyCode::Enter => KeyAction::Key(Key::Enter),
        KeyCode::Backspace => KeyAction::Key(Key::Backspace),
        KeyCode::Tab => KeyAction::Key(Key::Tab),
        KeyCode::Modifier(_) => KeyAction::Key(Key::Modifier),
        _ => KeyAction::Ignore,
    }
}

/// Restores the terminal on drop.
struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), EnableBracketedPaste)?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), DisableBracketedPaste);
        let _ = terminal::disable_raw_mode();
    }
}

pub async fn run(options: SessionOptions) -> anyhow::Result<()> {
    let sink: Arc<dyn OutputSink> = Arc::new(TerminalSink::raw());
    let handoff = Arc::new(InputHandoff::new());
    let editor = ExternalEditor::new(options.config.editor.command.clone())
        .with_suffix(options.config.editor.suffix.clone())
        .with_raw_mode_handoff(true)
        .with_input_handoff(Arc::clone(&handoff));

    let (source, mut repl) = build_session(&options, Arc::clone(&sink), Arc::new(editor))
        .context("invalid hook configuration")?;

    let guard = RawModeGuard::enter().context("failed to enter raw mode")?;
    sink.write(&format!("{}\n", options.config.console.intro.dimmed()));

    let stop = Arc::new(AtomicBool::new(false));
    let reader = spawn_reader(source.clone(), handoff, Arc::clone(&stop));

    let result = repl.run().await;

    stop.store(true, Ordering::SeqCst);
    source.close();
    if reader.join().is_err() {
        warn!("input reader panicked");
    }
    sink.write("\n");
    drop(guard);

    result.context("console session failed")
}

fn spawn_reader(
    source: LineSource,
    handoff: Arc<InputHandoff>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<()> {
    std::thread::spawn(move || {
        if let Err(e) = read_events(&source, &handoff, &stop) {
            warn!("terminal input failed: {}", e);
        }
        // An editor waiting on a dead reader may start right away.
        handoff.set_parked(true);
        source.close();
    })
}

/// Park the reader while the source is suspended.
///
/// Unparking comes first: once an editor has seen the reader parked, the
/// reader checks the suspension again before it can read any input.
fn park_if_suspended(
    source: &LineSource,
    handoff: &InputHandoff,
) -> bool {
    handoff.set_parked(false);
    if source.is_suspended() {
        handoff.set_parked(true);
        return true;
    }
    false
}

fn read_events(
    source: &LineSource,
    handoff: &InputHandoff,
    stop: &AtomicBool,
) -> io::Result<()> {
    while !stop.load(Ordering::SeqCst) && !source.is_closed() {
        if park_if_suspended(source, handoff) {
            std::thread::sleep(POLL_INTERVAL);
            continue;
        }
        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) => match map_key(&key) {
                KeyAction::Key(key) => source.handle_key(key),
                KeyAction::Quit => {
                    debug!("quit requested");
                    return Ok(());
                }
                KeyAction::Ignore => {}
            },
            Event::Paste(text) => source.paste(&text),
            _ => {}
        }
    }
    Ok(())
}
