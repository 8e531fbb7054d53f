//! Model and registry access for editing the Windows `PATH` variable.
//!
//! A raw `PATH` value is read per [`PathScope`] through a [`PathReader`],
//! split into [`PathEntry`] records held by a [`PathList`], edited, and
//! joined back for writing.

pub mod config;
pub mod entry;
pub mod env;
pub mod error;
pub mod list;
pub mod logging;
pub mod reader;
#[cfg(windows)]
pub mod registry;

pub use config::Settings;
pub use entry::{Field, PathEntry, Subscription};
pub use env::{expand_env_vars, EnvSource, MapEnv, ProcessEnv, SharedEnv};
pub use error::{Error, Result};
pub use list::{join_path, split_path, PathList};
pub use reader::{EnvironmentStore, MemoryStore, PathReader, PathScope};
#[cfg(windows)]
pub use registry::RegistryStore;
