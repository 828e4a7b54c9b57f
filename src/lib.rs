//! Hookline
//!
//! An interactive line console. Keystrokes and pastes become lines, a hook
//! pipeline may route a line through a structured editor first, and the
//! driver executes what comes back against an [`console::Engine`]. Bindings
//! whose source text is worth keeping are recorded verbatim in a plain-text
//! store, so re-entering a bound name brings its definition back for editing.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use hookline::console::{EditorBridge, LineSource, Repl, Transcript};
//! use hookline::lang::Interpreter;
//! # struct NoEditor;
//! # impl hookline::console::StructuredEditor for NoEditor {
//! #     fn open(&self, _seed: &str, handle: hookline::console::EditorHandle) { handle.cancel(); }
//! # }
//!
//! # async fn demo() -> hookline::Result<()> {
//! let transcript = Transcript::new();
//! let source = LineSource::new(Arc::new(transcript.clone()));
//! let bridge = EditorBridge::new(source.clone(), Arc::new(NoEditor));
//! let engine = Interpreter::new(Arc::new(transcript.clone()));
//! let mut repl = Repl::new(engine, source.clone(), bridge);
//!
//! source.paste("x = 1\nx + 1\n");
//! source.close();
//! repl.run().await?;
//! # Ok(())
//! # }
//! ```

#![warn(rust_2018_idioms)]

pub mod console;
pub mod host;
pub mod lang;
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Program name
pub const NAME: &str = "Hookline";
