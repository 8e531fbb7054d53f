//! Splitting a PATH value into entries and joining it back, plus the list
//! operations the editor offers.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::entry::{Field, PathEntry, Subscription};
use crate::env::SharedEnv;
use crate::reader::PathScope;

pub fn split_path(path: &str) -> Vec<String> {
    path.split(';')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

pub fn join_path<S: AsRef<str>>(parts: &[S]) -> String {
    let parts: Vec<&str> = parts.iter().map(|p| p.as_ref()).collect();
    parts.join(";")
}

/// The edited entries of one scope's PATH.
pub struct PathList {
    scope: PathScope,
    entries: Vec<PathEntry>,
    env: SharedEnv,
}

impl fmt::Debug for PathList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathList")
            .field("scope", &self.scope)
            .field("entries", &self.entries)
            .finish()
    }
}

impl PathList {
    pub fn new(scope: PathScope, env: SharedEnv) -> Self {
        Self {
            scope,
            entries: Vec::new(),
            env,
        }
    }

    pub fn from_raw(scope: PathScope, raw: &str, env: SharedEnv) -> Self {
        let entries = split_path(raw)
            .into_iter()
            .map(|part| PathEntry::new(part, env.clone()))
            .collect();
        Self { scope, entries, env }
    }

    pub fn scope(&self) -> PathScope {
        self.scope
    }

    pub fn entries(&self) -> &[PathEntry] {
        &self.entries
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut PathEntry> {
        self.entries.get_mut(idx)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Subscribes a copy of `listener` to every entry currently in the list.
    pub fn subscribe_all<F>(&mut self, listener: F) -> Vec<Subscription>
    where
        F: FnMut(&PathEntry, Field) + Clone + 'static,
    {
        self.entries
            .iter_mut()
            .map(|e| e.subscribe(listener.clone()))
            .collect()
    }

    /// The value to persist: enabled entries only, in list order.
    pub fn to_raw(&self) -> String {
        join_path(
            &self
                .entries
                .iter()
                .filter(|e| e.enabled())
                .map(PathEntry::path)
                .collect::<Vec<_>>(),
        )
    }

    /// Appends a new entry. Blank input is ignored.
    pub fn push(&mut self, path: &str) -> bool {
        let path = path.trim();
        if path.is_empty() {
            return false;
        }
        self.entries.push(PathEntry::new(path, self.env.clone()));
        true
    }

    /// Removes the given indices and returns how many were removed.
    pub fn remove(&mut self, indices: &BTreeSet<usize>) -> usize {
        let before = self.entries.len();
        let mut idx = 0;
        self.entries.retain(|_| {
            let keep = !indices.contains(&idx);
            idx += 1;
            keep
        });
        before - self.entries.len()
    }

    /// Moves each selected entry one slot up, never past another selected
    /// entry. Returns the new selection.
    pub fn move_up(&mut self, selected: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut moved = selected.clone();
        for idx in selected.iter().copied() {
            if idx > 0 && idx < self.entries.len() && !moved.contains(&(idx - 1)) {
                self.entries.swap(idx, idx - 1);
                moved.remove(&idx);
                moved.insert(idx - 1);
            }
        }
        moved
    }

    /// Mirror of [`PathList::move_up`].
    pub fn move_down(&mut self, selected: &BTreeSet<usize>) -> BTreeSet<usize> {
        let mut moved = selected.clone();
        for idx in selected.iter().copied().rev() {
            if idx + 1 < self.entries.len() && !moved.contains(&(idx + 1)) {
                self.entries.swap(idx, idx + 1);
                moved.remove(&idx);
                moved.insert(idx + 1);
            }
        }
        moved
    }

    /// Drops later entries equal to an earlier one. Equality is the raw path
    /// string, so `%NAME%` spellings are never merged with what they expand to.
    pub fn dedupe(&mut self) -> usize {
        let before = self.entries.len();
        let mut seen = HashSet::new();
        self.entries.retain(|e| seen.insert(e.path().to_owned()));
        before - self.entries.len()
    }

    pub fn sort(&mut self) {
        self.entries.sort_by_cached_key(|e| e.path().to_lowercase());
    }

    /// Indices whose path contains `filter`, ignoring case. A blank filter
    /// matches everything.
    pub fn matching(&self, filter: &str) -> Vec<usize> {
        let filter = filter.trim().to_lowercase();
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| filter.is_empty() || e.path().to_lowercase().contains(&filter))
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn missing(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.exists())
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn refresh_existence(&mut self) -> usize {
        self.entries
            .iter_mut()
            .filter_map(PathEntry::refresh_exists)
            .count()
    }

    pub fn expanded_report(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}\n    -> {}", e.path(), e.path_expanded()))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
