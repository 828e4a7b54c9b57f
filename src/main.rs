//! Hookline - CLI

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use hookline::host::{self, SessionOptions};
use hookline::util::config::{load_config_from, load_user_config, UserConfig};
use hookline::util::logger::{self, LogLevel};
use hookline::{NAME, VERSION};
use tracing::debug;

/// Interactive line console with editor hooks
#[derive(Parser, Debug)]
#[command(name = "hookline")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.config/hookline/config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Prompt string
    #[arg(short, long)]
    prompt: Option<String>,

    /// Disable the hook pipeline
    #[arg(long)]
    no_hooks: bool,

    /// Editor command for structured editing
    #[arg(short, long, value_name = "COMMAND")]
    editor: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<UserConfig> {
    let mut config = match &args.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => load_user_config().context("Failed to load user config")?,
    };
    if let Some(prompt) = &args.prompt {
        config.console.prompt = prompt.clone();
    }
    if let Some(editor) = &args.editor {
        config.editor.command = Some(editor.clone());
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log.level.parse().unwrap_or_else(|e| {
            eprintln!("{}, using warn", e);
            LogLevel::Warn
        })
    };
    logger::init_with_level(level);
    debug!("{} {} on {}", NAME, VERSION, std::env::consts::OS);

    let interactive = std::io::stdin().is_terminal();
    if !interactive {
        debug!("stdin is not a terminal, hooks disabled");
    }
    let options = SessionOptions {
        config,
        hooks: interactive && !args.no_hooks,
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async move {
        if interactive {
            host::terminal::run(options).await
        } else {
            host::piped::run(options).await
        }
    })
}
