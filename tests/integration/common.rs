//! Shared test fixtures

use std::collections::VecDeque;
use std::sync::Arc;

use hookline::console::{EditorHandle, LineSource, OutputSink, Repl, StructuredEditor, Transcript};
use hookline::host::{build_session, SessionOptions};
use hookline::lang::Interpreter;
use hookline::util::config::UserConfig;
use parking_lot::Mutex;

/// Answers each session from a script, before `open` returns.
/// `None` cancels; an exhausted script cancels too.
#[derive(Default)]
pub struct Scripted {
    replies: Mutex<VecDeque<Option<String>>>,
    pub seeds: Mutex<Vec<String>>,
}

impl Scripted {
    pub fn new(replies: &[Option<&str>]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.map(str::to_string)).collect()),
            seeds: Mutex::new(Vec::new()),
        })
    }
}

impl StructuredEditor for Scripted {
    fn open(
        &self,
        seed: &str,
        handle: EditorHandle,
    ) {
        self.seeds.lock().push(seed.to_string());
        match self.replies.lock().pop_front().flatten() {
            Some(text) => handle.accept(text),
            None => handle.cancel(),
        };
    }
}

/// Keeps handles for the test to complete later.
#[derive(Default)]
pub struct Manual {
    pub handles: Mutex<Vec<EditorHandle>>,
}

impl StructuredEditor for Manual {
    fn open(
        &self,
        _seed: &str,
        handle: EditorHandle,
    ) {
        self.handles.lock().push(handle);
    }
}

pub struct Session {
    pub source: LineSource,
    pub repl: Repl<Interpreter>,
    pub transcript: Transcript,
}

/// A reference-engine session with the default hook pipeline.
pub fn session(editor: Arc<dyn StructuredEditor>) -> Session {
    let transcript = Transcript::new();
    let sink: Arc<dyn OutputSink> = Arc::new(transcript.clone());
    let options = SessionOptions {
        config: UserConfig::default(),
        hooks: true,
    };
    let (source, repl) = build_session(&options, sink, editor).unwrap();
    Session {
        source,
        repl,
        transcript,
    }
}
