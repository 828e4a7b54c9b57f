//! Execution Engine Adapter
//!
//! The console never interprets source itself. Everything it needs from
//! an engine goes through [`Engine`].

use std::fmt;

use crate::console::error::ExecError;
use crate::console::snapshot::Snapshot;

/// Category of a user-code error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Name,
    Type,
    ZeroDivision,
    Recursion,
    Runtime,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Syntax => "SyntaxError",
            ErrorKind::Name => "NameError",
            ErrorKind::Type => "TypeError",
            ErrorKind::ZeroDivision => "ZeroDivisionError",
            ErrorKind::Recursion => "RecursionError",
            ErrorKind::Runtime => "RuntimeError",
        }
    }
}

/// A recognised error raised by submitted code.
///
/// Displayed as `Kind: message`, which is exactly what the driver prints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserError {
    pub kind: ErrorKind,
    pub message: String,
}

impl UserError {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for UserError {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl std::error::Error for UserError {}

/// Outcome of a successful [`Engine::execute`].
#[derive(Debug)]
pub struct Execution<V> {
    /// Final-expression value; `None` when nothing was produced.
    pub value: Option<std::sync::Arc<V>>,
}

impl<V> Execution<V> {
    pub fn empty() -> Self {
        Self { value: None }
    }

    pub fn with_value(value: std::sync::Arc<V>) -> Self {
        Self { value: Some(value) }
    }
}

/// Execution Engine Adapter
///
/// Runs submitted source against a persistent environment. Values are
/// handed out as `Arc`s; two snapshots agree on a binding iff they hold
/// the same allocation.
pub trait Engine {
    type Value;

    /// Execute `source` against the persistent environment.
    fn execute(
        &mut self,
        source: &str,
    ) -> Result<Execution<Self::Value>, ExecError>;

    /// Canonical textual representation of a value.
    fn represent(
        &self,
        value: &Self::Value,
    ) -> String;

    /// Current top-level bindings.
    fn environment(&self) -> Snapshot<Self::Value>;

    /// Whether the value is function-like.
    fn is_callable(
        &self,
        value: &Self::Value,
    ) -> bool;
}
