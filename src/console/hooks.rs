//! Hook Pipeline
//!
//! An ordered list of detectors run on every completed line. The first
//! detector that proposes a seed document wins; the line is then routed to
//! the structured editor instead of being executed.
//!
//! Detection is textual on purpose. Nothing here parses the language.

use regex::Regex;
use tracing::debug;

use crate::console::adapter::Engine;
use crate::console::store::PlainTextStore;
use crate::util::config::HooksConfig;

/// What a detector may learn about a binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub callable: bool,
    pub repr: String,
}

/// Read-only view of the execution environment.
pub trait Bindings {
    fn binding(
        &self,
        name: &str,
    ) -> Option<Binding>;
}

/// [`Bindings`] backed by an engine's current environment.
pub struct EngineBindings<'a, E: Engine>(pub &'a E);

impl<E: Engine> Bindings for EngineBindings<'_, E> {
    fn binding(
        &self,
        name: &str,
    ) -> Option<Binding> {
        let env = self.0.environment();
        let value = env.get(name)?;
        Some(Binding {
            callable: self.0.is_callable(value),
            repr: self.0.represent(value),
        })
    }
}

/// Everything a detector can consult.
pub struct HookContext<'a> {
    pub bindings: &'a dyn Bindings,
    pub store: &'a PlainTextStore,
}

impl<'a> HookContext<'a> {
    pub fn new(
        bindings: &'a dyn Bindings,
        store: &'a PlainTextStore,
    ) -> Self {
        Self { bindings, store }
    }
}

pub trait Detector: Send {
    fn name(&self) -> &str;

    /// Seed document for the editor, or `None` to let the line through.
    fn detect(
        &self,
        line: &str,
        cx: &HookContext<'_>,
    ) -> Option<String>;
}

/// A detector's winning proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub detector: String,
    pub seed: String,
}

#[derive(Default)]
pub struct HookPipeline {
    detectors: Vec<Box<dyn Detector>>,
}

impl std::fmt::Debug for HookPipeline {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_list()
            .entries(self.detectors.iter().map(|d| d.name()))
            .finish()
    }
}

impl HookPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block-opener then re-edit, each subject to its config switch.
    pub fn from_config(config: &HooksConfig) -> Result<Self, regex::Error> {
        let mut pipeline = Self::new();
        if config.block_opener {
            pipeline.register(BlockOpenerDetector::new(
                config.block_keywords.as_slice(),
                config.indent.clone(),
            )?);
        }
        if config.re_edit {
            pipeline.register(ReEditDetector);
        }
        Ok(pipeline)
    }

    pub fn register(
        &mut self,
        detector: impl Detector + 'static,
    ) {
        self.detectors.push(Box::new(detector));
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Run detectors in registration order, stopping at the first proposal.
    pub fn run(
        &self,
        line: &str,
        cx: &HookContext<'_>,
    ) -> Option<Proposal> {
        self.detectors.iter().find_map(|detector| {
            let seed = detector.detect(line, cx).filter(|s| !s.is_empty())?;
            debug!(detector = detector.name(), "line intercepted");
            Some(Proposal {
                detector: detector.name().to_string(),
                seed,
            })
        })
    }
}

pub const DEFAULT_BLOCK_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "for", "while", "def", "class", "with", "try", "except", "finally",
];

/// Matches `keyword ... :` and proposes the line plus one indented
/// continuation line.
#[derive(Debug, Clone)]
pub struct BlockOpenerDetector {
    pattern: Regex,
    indent: String,
}

impl BlockOpenerDetector {
    pub fn new<S: AsRef<str>>(
        keywords: &[S],
        indent: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        let alternatives: Vec<String> = keywords
            .iter()
            .map(|k| regex::escape(k.as_ref()))
            .collect();
        let pattern = Regex::new(&format!(
            r"^(?:{})(?:[\s(:].*)?:$",
            alternatives.join("|")
        ))?;
        Ok(Self {
            pattern,
            indent: indent.into(),
        })
    }
}

impl Detector for BlockOpenerDetector {
    fn name(&self) -> &str {
        "block-opener"
    }

    fn detect(
        &self,
        line: &str,
        _cx: &HookContext<'_>,
    ) -> Option<String> {
        let trimmed = line.trim();
        self.pattern
            .is_match(trimmed)
            .then(|| format!("{}\n{}", trimmed, self.indent))
    }
}

/// Matches a bare binding name and proposes its defining text, or a
/// synthesised assignment from its representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReEditDetector;

impl Detector for ReEditDetector {
    fn name(&self) -> &str {
        "re-edit"
    }

    fn detect(
        &self,
        line: &str,
        cx: &HookContext<'_>,
    ) -> Option<String> {
        let name = line.trim();
        if !is_identifier(name) {
            return None;
        }
        let binding = cx.bindings.binding(name)?;
        if let Some(source) = cx.store.get(name) {
            return Some(source.to_string());
        }
        if binding.callable {
            return None;
        }
        Some(format!("{} = {}", name, binding.repr))
    }
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c == '_' || unicode_ident::is_xid_start(c) => {
            chars.all(unicode_ident::is_xid_continue)
        }
        _ => false,
    }
}
