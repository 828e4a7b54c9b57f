//! Hosts
//!
//! Wire a console session to a real input device:
//! - [`terminal`] - raw-mode terminal with keystroke and bracketed-paste input
//! - [`piped`] - non-interactive stdin, one line per read request

pub mod piped;
pub mod terminal;

use std::sync::Arc;

use crate::console::{EditorBridge, HookPipeline, LineSource, OutputSink, Repl, StructuredEditor};
use crate::lang::Interpreter;
use crate::util::config::UserConfig;

/// Host-independent session options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub config: UserConfig,
    /// Register the hook pipeline from `config.hooks`
    pub hooks: bool,
}

/// Assemble line source, editor bridge, engine and driver.
pub fn build_session(
    options: &SessionOptions,
    sink: Arc<dyn OutputSink>,
    editor: Arc<dyn StructuredEditor>,
) -> Result<(LineSource, Repl<Interpreter>), regex::Error> {
    let config = &options.config;
    let source = LineSource::new(Arc::clone(&sink)).with_indent(config.hooks.indent.clone());
    let bridge = EditorBridge::new(source.clone(), editor);
    let engine = Interpreter::new(sink)
        .with_max_loop_iterations(config.engine.max_loop_iterations);

    let hooks = if options.hooks {
        HookPipeline::from_config(&config.hooks)?
    } else {
        HookPipeline::new()
    };

    let repl = Repl::new(engine, source.clone(), bridge)
        .with_hooks(hooks)
        .with_prompt(config.console.prompt.clone());
    Ok((source, repl))
}
