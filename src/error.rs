use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::reader::PathScope;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("registry key `{}\\{key}` for the {scope} PATH was not found", scope.hive())]
    RegistryKeyNotFound { scope: PathScope, key: &'static str },

    #[error("registry value `{name}` for the {scope} PATH is missing or is not a string")]
    RegistryValueMissing { scope: PathScope, name: &'static str },

    #[error("permission denied writing the {scope} PATH (administrator rights are required)")]
    PermissionDenied { scope: PathScope },

    #[error("registry access for the {scope} PATH failed: {source}")]
    Registry {
        scope: PathScope,
        #[source]
        source: io::Error,
    },

    #[error("failed to load configuration from {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl Error {
    /// Maps a raw OS error from opening or writing a scope's key.
    #[cfg_attr(not(windows), allow(dead_code))]
    pub(crate) fn from_io(scope: PathScope, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Error::RegistryKeyNotFound {
                scope,
                key: scope.subkey(),
            },
            io::ErrorKind::PermissionDenied => Error::PermissionDenied { scope },
            _ => Error::Registry { scope, source: err },
        }
    }
}
