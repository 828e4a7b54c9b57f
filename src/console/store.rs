//! Plain-Text Store
//!
//! Maps a binding name to the exact source text that last defined it, so
//! a value can be re-edited in its original form instead of its repr.

use indexmap::IndexMap;

#[derive(Debug, Default, Clone)]
pub struct PlainTextStore {
    entries: IndexMap<String, String>,
}

impl PlainTextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        name: &str,
    ) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.entries.contains_key(name)
    }

    /// Create or overwrite the entry for `name`. Entries are never removed.
    pub fn record(
        &mut self,
        name: impl Into<String>,
        source: impl Into<String>,
    ) {
        self.entries.insert(name.into(), source.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
