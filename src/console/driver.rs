//! REPL Driver
//!
//! The control loop. Each iteration prompts, waits for a line, gives the hook
//! pipeline a chance to redirect it into the editor, executes the final text
//! and attributes the resulting environment change to it.

use std::sync::Arc;

use tracing::{debug, error};

use crate::console::adapter::Engine;
use crate::console::editor::EditorBridge;
use crate::console::error::{ConsoleError, ExecError, Result};
use crate::console::hooks::{EngineBindings, HookContext, HookPipeline};
use crate::console::line_source::LineSource;
use crate::console::sink::OutputSink;
use crate::console::snapshot::{ChangeKind, Snapshot};
use crate::console::store::PlainTextStore;

/// Where the driver currently is within an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    AwaitingLine,
    AwaitingEditor,
    Executing,
}

/// Outcome of one [`Repl::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Iteration {
    /// Empty input, including a cancelled editor session.
    Blank,
    /// Code ran. `printed` is the representation that was shown, `recorded`
    /// the binding whose source text was stored.
    Executed {
        printed: Option<String>,
        recorded: Option<String>,
    },
    /// The code raised a recognised error; its text was printed.
    UserError(String),
}

pub struct Repl<E: Engine> {
    engine: E,
    source: LineSource,
    bridge: EditorBridge,
    hooks: HookPipeline,
    store: PlainTextStore,
    sink: Arc<dyn OutputSink>,
    prompt: String,
    state: DriverState,
}

impl<E: Engine> Repl<E> {
    /// Output goes to the source's sink.
    pub fn new(
        engine: E,
        source: LineSource,
        bridge: EditorBridge,
    ) -> Self {
        let sink = Arc::clone(source.sink());
        Self {
            engine,
            source,
            bridge,
            hooks: HookPipeline::new(),
            store: PlainTextStore::new(),
            sink,
            prompt: ">>> ".to_string(),
            state: DriverState::AwaitingLine,
        }
    }

    pub fn with_hooks(
        mut self,
        hooks: HookPipeline,
    ) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_prompt(
        mut self,
        prompt: impl Into<String>,
    ) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn store(&self) -> &PlainTextStore {
        &self.store
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Run until the input closes (`Ok`) or a fatal error occurs (`Err`).
    pub async fn run(&mut self) -> Result<()> {
        loop {
            match self.step().await {
                Ok(_) => {}
                Err(ConsoleError::InputClosed) => {
                    debug!("input closed, leaving loop");
                    return Ok(());
                }
                Err(e) => {
                    error!("fatal: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// One iteration of the loop.
    pub async fn step(&mut self) -> Result<Iteration> {
        self.state = DriverState::AwaitingLine;
        self.sink.write(&self.prompt);

        let mut text = self.source.next_line().await?;
        if text.trim().is_empty() {
            return Ok(Iteration::Blank);
        }

        let proposal = {
            let bindings = EngineBindings(&self.engine);
            let cx = HookContext::new(&bindings, &self.store);
            self.hooks.run(text.trim(), &cx)
        };

        if let Some(proposal) = proposal {
            // Editor output is executed as-is; running hooks on it again
            // would reopen the editor on an unchanged re-edit seed.
            self.state = DriverState::AwaitingEditor;
            self.bridge.spawn(&proposal.seed)?;
            text = self.source.next_line().await?;
            self.state = DriverState::AwaitingLine;
            if text.trim().is_empty() {
                return Ok(Iteration::Blank);
            }
        }

        self.state = DriverState::Executing;
        let before = self.engine.environment();

        let execution = match self.engine.execute(&text) {
            Ok(execution) => execution,
            Err(ExecError::User(err)) => {
                let message = err.to_string();
                self.sink.write(&message);
                self.sink.write("\n");
                self.state = DriverState::AwaitingLine;
                return Ok(Iteration::UserError(message));
            }
            Err(ExecError::Integration(err)) => {
                return Err(ConsoleError::Integration(err));
            }
        };

        let printed = execution.value.map(|value| {
            let repr = self.engine.represent(&value);
            self.sink.write(&repr);
            self.sink.write("\n");
            repr
        });

        let after = self.engine.environment();
        let recorded = self.reconcile(&before, &after, &text);
        self.state = DriverState::AwaitingLine;

        Ok(Iteration::Executed { printed, recorded })
    }

    /// Store `source` for the changed binding when exactly one changed.
    fn reconcile(
        &mut self,
        before: &Snapshot<E::Value>,
        after: &Snapshot<E::Value>,
        source: &str,
    ) -> Option<String> {
        let changes = before.diff(after);
        let [change] = changes.as_slice() else {
            debug!(changed = changes.len(), "diff not attributable, store untouched");
            return None;
        };
        if change.kind == ChangeKind::Removed {
            return None;
        }

        let value = after.get(&change.name)?;
        if self.engine.is_callable(value) && !self.store.contains(&change.name) {
            debug!(name = %change.name, "callable without recorded source, skipped");
            return None;
        }

        debug!(name = %change.name, "recording source text");
        self.store.record(change.name.clone(), source);
        Some(change.name.clone())
    }
}

impl<E: Engine + std::fmt::Debug> std::fmt::Debug for Repl<E> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Repl")
            .field("engine", &self.engine)
            .field("state", &self.state)
            .field("hooks", &self.hooks)
            .field("store", &self.store)
            .finish()
    }
}
