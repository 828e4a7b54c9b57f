//! Console Module
//!
//! The input pipeline in front of an execution engine:
//! - [`line_source::LineSource`] - keystroke/paste ingestion and the read request
//! - [`hooks::HookPipeline`] - detectors that redirect lines into the editor
//! - [`editor::EditorBridge`] - structured editor sessions
//! - [`driver::Repl`] - the control loop and source reconciliation
//! - [`store::PlainTextStore`] - original source text per binding
//! - [`adapter::Engine`] - what the console needs from an engine

pub mod adapter;
pub mod driver;
pub mod editor;
pub mod error;
pub mod hooks;
pub mod line_source;
pub mod sink;
pub mod snapshot;
pub mod store;

pub use adapter::{Engine, ErrorKind, Execution, UserError};
pub use driver::{DriverState, Iteration, Repl};
pub use editor::{EditorBridge, EditorHandle, ExternalEditor, InputHandoff, StructuredEditor};
pub use error::{ConsoleError, ExecError};
pub use hooks::{
    BlockOpenerDetector, Detector, HookContext, HookPipeline, Proposal, ReEditDetector,
    DEFAULT_BLOCK_KEYWORDS,
};
pub use line_source::{Key, LineSource};
pub use sink::{OutputSink, TerminalSink, Transcript};
pub use snapshot::{Change, ChangeKind, Snapshot};
pub use store::PlainTextStore;
