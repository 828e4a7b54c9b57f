//! Environment snapshots and diffing

use std::sync::Arc;

use indexmap::IndexMap;

/// Immutable capture of the top-level bindings at one point in time.
#[derive(Debug)]
pub struct Snapshot<V> {
    bindings: IndexMap<String, Arc<V>>,
}

impl<V> Clone for Snapshot<V> {
    fn clone(&self) -> Self {
        Self {
            bindings: self.bindings.clone(),
        }
    }
}

impl<V> Default for Snapshot<V> {
    fn default() -> Self {
        Self {
            bindings: IndexMap::new(),
        }
    }
}

impl<V> FromIterator<(String, Arc<V>)> for Snapshot<V> {
    fn from_iter<I: IntoIterator<Item = (String, Arc<V>)>>(iter: I) -> Self {
        Self {
            bindings: iter.into_iter().collect(),
        }
    }
}

impl<V> Snapshot<V> {
    pub fn get(
        &self,
        name: &str,
    ) -> Option<&Arc<V>> {
        self.bindings.get(name)
    }

    pub fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Bindings that differ between `self` (before) and `after`.
    ///
    /// Values are compared by identity, never structurally.
    pub fn diff(
        &self,
        after: &Snapshot<V>,
    ) -> Vec<Change> {
        let mut changes = Vec::new();

        for (name, value) in &after.bindings {
            match self.bindings.get(name) {
                None => changes.push(Change::new(name, ChangeKind::Added)),
                Some(prev) if !Arc::ptr_eq(prev, value) => {
                    changes.push(Change::new(name, ChangeKind::Rebound))
                }
                Some(_) => {}
            }
        }

        for name in self.bindings.keys() {
            if !after.bindings.contains_key(name) {
                changes.push(Change::new(name, ChangeKind::Removed));
            }
        }

        changes
    }
}

/// How a binding changed across one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Rebound,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub name: String,
    pub kind: ChangeKind,
}

impl Change {
    fn new(
        name: &str,
        kind: ChangeKind,
    ) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pairs: &[(&str, &Arc<i32>)]) -> Snapshot<i32> {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), Arc::clone(v)))
            .collect()
    }

    #[test]
    fn test_identity_not_equality() {
        let a = Arc::new(5);
        let b = Arc::new(5);
        let before = snap(&[("x", &a)]);
        let after = snap(&[("x", &b)]);
        assert_eq!(
            before.diff(&after),
            vec![Change::new("x", ChangeKind::Rebound)]
        );

        let same = snap(&[("x", &a)]);
        assert!(before.diff(&same).is_empty());
    }

    #[test]
    fn test_added_and_removed() {
        let a = Arc::new(1);
        let b = Arc::new(2);
        let before = snap(&[("gone", &a)]);
        let after = snap(&[("new", &b)]);
        let changes = before.diff(&after);
        assert_eq!(changes.len(), 2);
        assert!(changes.contains(&Change::new("new", ChangeKind::Added)));
        assert!(changes.contains(&Change::new("gone", ChangeKind::Removed)));
    }
}
