//! One segment of a PATH value, with change notification.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;

use tracing::trace;

use crate::env::{expand_env_vars, SharedEnv};

/// A field of [`PathEntry`] whose value changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Path,
    Exists,
    Enabled,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Path => "Path",
            Field::Exists => "Exists",
            Field::Enabled => "Enabled",
        }
    }
}

/// Token returned by [`PathEntry::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&PathEntry, Field)>;

/// A single PATH segment as shown in the editor.
///
/// `exists` always matches the current `path`. Every setter returns the
/// fields it actually changed, in the order their listeners were notified;
/// an assignment of the current value changes and notifies nothing.
pub struct PathEntry {
    path: String,
    exists: bool,
    enabled: bool,
    env: SharedEnv,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
}

impl PathEntry {
    pub fn new(path: impl Into<String>, env: SharedEnv) -> Self {
        let mut entry = Self {
            path: path.into(),
            exists: false,
            enabled: true,
            env,
            listeners: Vec::new(),
            next_subscription: 0,
        };
        entry.exists = entry.exists_on_disk();
        entry
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// `path` with environment references resolved against the current
    /// environment. Not cached.
    pub fn path_expanded(&self) -> String {
        expand_env_vars(&self.path, self.env.as_ref())
    }

    /// Whether the expanded path names an existing directory.
    pub fn exists_on_disk(&self) -> bool {
        Path::new(&self.path_expanded()).is_dir()
    }

    /// Sets the path and recomputes `exists`. `Path` is always reported
    /// before `Exists`.
    pub fn set_path(&mut self, path: impl Into<String>) -> Vec<Field> {
        let path = path.into();
        if path == self.path {
            return Vec::new();
        }
        self.path = path;
        self.emit(Field::Path);

        let mut changed = vec![Field::Path];
        let exists = self.exists_on_disk();
        changed.extend(self.set_exists(exists));
        changed
    }

    pub fn set_exists(&mut self, exists: bool) -> Option<Field> {
        if exists == self.exists {
            return None;
        }
        self.exists = exists;
        self.emit(Field::Exists);
        Some(Field::Exists)
    }

    pub fn set_enabled(&mut self, enabled: bool) -> Option<Field> {
        if enabled == self.enabled {
            return None;
        }
        self.enabled = enabled;
        self.emit(Field::Enabled);
        Some(Field::Enabled)
    }

    /// Re-checks the filesystem without changing the path.
    pub fn refresh_exists(&mut self) -> Option<Field> {
        let exists = self.exists_on_disk();
        self.set_exists(exists)
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&PathEntry, Field) + 'static) -> Subscription {
        let id = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(id, _)| *id != subscription);
        self.listeners.len() != before
    }

    fn emit(&mut self, field: Field) {
        trace!(field = field.name(), path = %self.path, "entry changed");
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(self, field);
        }
        self.listeners = listeners;
    }
}

impl fmt::Debug for PathEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathEntry")
            .field("path", &self.path)
            .field("exists", &self.exists)
            .field("enabled", &self.enabled)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Entries are equal when their `path` strings are equal.
impl PartialEq for PathEntry {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for PathEntry {}

impl Hash for PathEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::rc::Rc;
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;
    use crate::env::MapEnv;

    fn env() -> SharedEnv {
        Arc::new(MapEnv::new())
    }

    fn record(entry: &mut PathEntry) -> Rc<RefCell<Vec<Field>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        entry.subscribe(move |_, field| sink.borrow_mut().push(field));
        seen
    }

    #[test]
    fn new_entry_is_enabled_and_checks_existence() {
        let dir = tempdir().unwrap();
        let present = PathEntry::new(dir.path().to_string_lossy(), env());
        assert!(present.enabled());
        assert!(present.exists());

        let absent = PathEntry::new(dir.path().join("missing").to_string_lossy(), env());
        assert!(absent.enabled());
        assert!(!absent.exists());
    }

    #[test]
    fn a_file_is_not_an_existing_directory() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("tool.exe");
        std::fs::write(&file, b"").unwrap();
        assert!(!PathEntry::new(file.to_string_lossy(), env()).exists());
    }

    #[test]
    fn path_change_with_existence_change_notifies_path_then_exists() {
        let dir = tempdir().unwrap();
        let mut entry = PathEntry::new(dir.path().join("nope").to_string_lossy(), env());
        let seen = record(&mut entry);

        let changed = entry.set_path(dir.path().to_string_lossy());

        assert_eq!(changed, vec![Field::Path, Field::Exists]);
        assert_eq!(*seen.borrow(), vec![Field::Path, Field::Exists]);
        assert!(entry.exists());
    }

    #[test]
    fn path_change_without_existence_change_notifies_path_only() {
        let dir = tempdir().unwrap();
        let mut entry = PathEntry::new(dir.path().join("a").to_string_lossy(), env());
        let seen = record(&mut entry);

        entry.set_path(dir.path().join("b").to_string_lossy());

        assert_eq!(*seen.borrow(), vec![Field::Path]);
        assert!(!entry.exists());
    }

    #[test]
    fn listeners_see_the_new_path_before_exists_fires() {
        let dir = tempdir().unwrap();
        let target = dir.path().to_string_lossy().into_owned();
        let mut entry = PathEntry::new(dir.path().join("x").to_string_lossy(), env());

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        entry.subscribe(move |e, field| {
            sink.borrow_mut()
                .push((field, e.path().to_string(), e.exists()))
        });
        entry.set_path(target.clone());

        let seen = seen.borrow();
        assert_eq!(seen[0], (Field::Path, target.clone(), false));
        assert_eq!(seen[1], (Field::Exists, target, true));
    }

    #[test]
    fn assigning_current_values_is_silent() {
        let mut entry = PathEntry::new(r"C:\Tools", env());
        let seen = record(&mut entry);

        assert!(entry.set_path(r"C:\Tools").is_empty());
        assert_eq!(entry.set_enabled(true), None);
        let exists = entry.exists();
        assert_eq!(entry.set_exists(exists), None);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn fields_have_display_names() {
        assert_eq!(Field::Path.name(), "Path");
        assert_eq!(Field::Exists.name(), "Exists");
        assert_eq!(Field::Enabled.name(), "Enabled");
    }

    #[test]
    fn enabled_toggle_notifies_once() {
        let mut entry = PathEntry::new(r"C:\Tools", env());
        let seen = record(&mut entry);

        assert_eq!(entry.set_enabled(false), Some(Field::Enabled));
        assert_eq!(entry.set_enabled(false), None);
        assert_eq!(*seen.borrow(), vec![Field::Enabled]);
    }

    #[test]
    fn every_listener_is_notified_and_unsubscribe_stops_delivery() {
        let mut entry = PathEntry::new("a", env());
        let first = record(&mut entry);
        let second = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&second);
        let id = entry.subscribe(move |_, _| *counter.borrow_mut() += 1);

        entry.set_enabled(false);
        assert!(entry.unsubscribe(id));
        assert!(!entry.unsubscribe(id));
        entry.set_enabled(true);

        assert_eq!(first.borrow().len(), 2);
        assert_eq!(*second.borrow(), 1);
    }

    #[test]
    fn expansion_tracks_the_live_environment() {
        let vars = Arc::new(MapEnv::new().with("TOOLS_HOME", r"D:\one"));
        let entry = PathEntry::new(r"%TOOLS_HOME%\bin", vars.clone());
        assert_eq!(entry.path_expanded(), r"D:\one\bin");

        vars.set("TOOLS_HOME", r"E:\two");
        assert_eq!(entry.path_expanded(), r"E:\two\bin");
        assert_eq!(entry.path(), r"%TOOLS_HOME%\bin");
    }

    #[test]
    fn existence_uses_the_expanded_path() {
        let dir = tempdir().unwrap();
        let vars = Arc::new(MapEnv::new().with("ROOT", &dir.path().to_string_lossy()));
        let entry = PathEntry::new("%ROOT%", vars);
        assert!(entry.exists());
    }

    #[test]
    fn refresh_picks_up_filesystem_changes() {
        let dir = tempdir().unwrap();
        let late = dir.path().join("late");
        let mut entry = PathEntry::new(late.to_string_lossy(), env());
        assert!(!entry.exists());

        std::fs::create_dir(&late).unwrap();
        assert_eq!(entry.refresh_exists(), Some(Field::Exists));
        assert!(entry.exists());
    }

    #[test]
    fn equality_only_looks_at_the_path() {
        let mut a = PathEntry::new(r"C:\Tools", env());
        let b = PathEntry::new(r"C:\Tools", env());
        a.set_enabled(false);
        a.set_exists(!b.exists());
        assert_eq!(a, b);

        let c = PathEntry::new(r"C:\Other", env());
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
