//! Reading and writing the raw PATH value of a scope.

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::env::SharedEnv;
use crate::error::{Error, Result};
use crate::list::PathList;

pub const USER_ENV_KEY: &str = "Environment";
pub const SYSTEM_ENV_KEY: &str = r"SYSTEM\CurrentControlSet\Control\Session Manager\Environment";
pub const PATH_VALUE: &str = "Path";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathScope {
    User,
    System,
}

impl PathScope {
    pub const ALL: [PathScope; 2] = [PathScope::User, PathScope::System];

    /// Subkey under HKCU (user) or HKLM (system).
    pub fn subkey(self) -> &'static str {
        match self {
            PathScope::User => USER_ENV_KEY,
            PathScope::System => SYSTEM_ENV_KEY,
        }
    }

    pub fn hive(self) -> &'static str {
        match self {
            PathScope::User => "HKCU",
            PathScope::System => "HKLM",
        }
    }
}

impl fmt::Display for PathScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathScope::User => write!(f, "User"),
            PathScope::System => write!(f, "System"),
        }
    }
}

/// Where PATH values are persisted.
///
/// `read_raw` must return the value exactly as stored, without expanding
/// environment references.
pub trait EnvironmentStore {
    fn read_raw(&self, scope: PathScope) -> Result<String>;
    fn write(&mut self, scope: PathScope, value: &str) -> Result<()>;
}

/// Reads and writes PATH through an [`EnvironmentStore`].
///
/// In dry-run mode writes are traced instead of persisted.
#[derive(Debug)]
pub struct PathReader<S> {
    store: S,
    dry_run: bool,
}

impl<S: EnvironmentStore> PathReader<S> {
    pub fn new(store: S, dry_run: bool) -> Self {
        Self { store, dry_run }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn set_dry_run(&mut self, dry_run: bool) {
        self.dry_run = dry_run;
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn read_path(&self, scope: PathScope) -> Result<String> {
        match self.store.read_raw(scope) {
            Ok(raw) => {
                debug!(%scope, len = raw.len(), "read PATH");
                Ok(raw)
            }
            Err(err) => {
                warn!(%scope, error = %err, "failed to read PATH");
                Err(err)
            }
        }
    }

    pub fn write_path(&mut self, scope: PathScope, value: &str) -> Result<()> {
        if self.dry_run {
            info!(%scope, value, "dry run: PATH not written");
            return Ok(());
        }
        match self.store.write(scope, value) {
            Ok(()) => {
                info!(%scope, len = value.len(), "wrote PATH");
                Ok(())
            }
            Err(err) => {
                warn!(%scope, error = %err, "failed to write PATH");
                Err(err)
            }
        }
    }

    pub fn load(&self, scope: PathScope, env: SharedEnv) -> Result<PathList> {
        let raw = self.read_path(scope)?;
        Ok(PathList::from_raw(scope, &raw, env))
    }

    pub fn save(&mut self, list: &PathList) -> Result<()> {
        self.write_path(list.scope(), &list.to_raw())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StoredValue {
    Text(String),
    NonString,
}

/// An in-memory [`EnvironmentStore`].
///
/// A scope with no key behaves like a missing registry key. When not
/// elevated, system-scope writes are rejected before anything changes.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    keys: HashMap<PathScope, Option<StoredValue>>,
    elevated: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            keys: HashMap::new(),
            elevated: true,
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Both keys present with the given values.
    pub fn with_paths(user: &str, system: &str) -> Self {
        Self::new()
            .with_value(PathScope::User, user)
            .with_value(PathScope::System, system)
    }

    pub fn with_value(mut self, scope: PathScope, value: &str) -> Self {
        self.keys
            .insert(scope, Some(StoredValue::Text(value.to_string())));
        self
    }

    /// The key exists but has no `Path` value.
    pub fn with_empty_key(mut self, scope: PathScope) -> Self {
        self.keys.insert(scope, None);
        self
    }

    /// The key holds a `Path` value that is not a string.
    pub fn with_non_string_value(mut self, scope: PathScope) -> Self {
        self.keys.insert(scope, Some(StoredValue::NonString));
        self
    }

    pub fn elevated(mut self, elevated: bool) -> Self {
        self.elevated = elevated;
        self
    }

    /// The stored text for `scope`, if any.
    pub fn value(&self, scope: PathScope) -> Option<&str> {
        match self.keys.get(&scope) {
            Some(Some(StoredValue::Text(text))) => Some(text.as_str()),
            _ => None,
        }
    }
}

impl EnvironmentStore for MemoryStore {
    fn read_raw(&self, scope: PathScope) -> Result<String> {
        match self.keys.get(&scope) {
            None => Err(Error::RegistryKeyNotFound {
                scope,
                key: scope.subkey(),
            }),
            Some(Some(StoredValue::Text(text))) => Ok(text.clone()),
            Some(_) => Err(Error::RegistryValueMissing {
                scope,
                name: PATH_VALUE,
            }),
        }
    }

    fn write(&mut self, scope: PathScope, value: &str) -> Result<()> {
        if scope == PathScope::System && !self.elevated {
            return Err(Error::PermissionDenied { scope });
        }
        let Some(slot) = self.keys.get_mut(&scope) else {
            return Err(Error::RegistryKeyNotFound {
                scope,
                key: scope.subkey(),
            });
        };
        *slot = Some(StoredValue::Text(value.to_string()));
        Ok(())
    }
}
