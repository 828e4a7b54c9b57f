//! Console error types

use crate::console::adapter::UserError;

/// Errors surfaced by the console pipeline.
///
/// User-code errors never appear here: the driver prints them and keeps
/// looping. Everything in this enum either ends the session cleanly
/// ([`ConsoleError::InputClosed`]) or is fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// The host closed the line source; no more input will arrive.
    #[error("input closed")]
    InputClosed,
    /// `spawn` was called while an editor session was still open.
    #[error("an editor session is already open")]
    EditorBusy,
    /// The execution engine failed in a way that is not a user-code error.
    #[error("engine integration failure: {0}")]
    Integration(#[source] anyhow::Error),
    /// Host I/O failure (terminal, stdin).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error returned by [`crate::console::adapter::Engine::execute`].
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    /// An error raised by the submitted code itself.
    #[error("{0}")]
    User(UserError),
    /// Anything else. Never caught by the driver.
    #[error(transparent)]
    Integration(anyhow::Error),
}

impl From<UserError> for ExecError {
    fn from(err: UserError) -> Self {
        ExecError::User(err)
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
