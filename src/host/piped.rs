//! Piped host
//!
//! Stdin is not a terminal. Each stdin line is pasted only once the driver
//! asks for a line, so the echoed input interleaves with prompts and output
//! the way an interactive session would.

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use crate::console::{LineSource, OutputSink, TerminalSink};
use crate::host::{build_session, SessionOptions};

/// No editor exists in piped mode; any session it is asked to open is
/// cancelled immediately.
struct NoEditor;

impl crate::console::StructuredEditor for NoEditor {
    fn open(
        &self,
        _seed: &str,
        handle: crate::console::EditorHandle,
    ) {
        handle.cancel();
    }
}

pub async fn run(options: SessionOptions) -> anyhow::Result<()> {
    let sink: Arc<dyn OutputSink> = Arc::new(TerminalSink::plain());
    run_with(options, tokio::io::stdin(), sink).await
}

/// Run a session fed from `input`, writing the transcript to `sink`.
pub async fn run_with<R>(
    options: SessionOptions,
    input: R,
    sink: Arc<dyn OutputSink>,
) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
{
    let (source, mut repl) =
        build_session(&options, sink, Arc::new(NoEditor)).context("invalid hook configuration")?;

    let feeder = feed(source.clone(), input);
    tokio::pin!(feeder);
    let session = repl.run();
    tokio::pin!(session);

    let mut feeding = true;
    loop {
        tokio::select! {
            result = &mut session => {
                source.close();
                return result.context("console session failed");
            }
            result = &mut feeder, if feeding => {
                feeding = false;
                source.close();
                result.context("failed to read stdin")?;
            }
        }
    }
}

async fn feed<R>(
    source: LineSource,
    input: R,
) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    loop {
        while !source.has_outstanding_request() {
            source.request_created().await;
        }
        match lines.next_line().await? {
            Some(line) => source.paste(&format!("{}\n", line)),
            None => {
                debug!("stdin exhausted");
                return Ok(());
            }
        }
    }
}
