//! Environment-variable lookup and `%NAME%` expansion.
//!
//! Expansion never reads the process environment directly; it goes through an
//! [`EnvSource`] so callers (and tests) decide where values come from.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Something that can resolve environment-variable names.
pub trait EnvSource {
    fn var(&self, name: &str) -> Option<String>;
}

/// Shared handle used by entries that must re-expand on every access.
pub type SharedEnv = Arc<dyn EnvSource + Send + Sync>;

/// The environment of the running process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

impl ProcessEnv {
    pub fn shared() -> SharedEnv {
        Arc::new(ProcessEnv)
    }
}

/// In-memory variables with case-insensitive names, as on Windows.
///
/// Values can be changed through a shared reference so that entries holding
/// the source observe updates on their next expansion.
#[derive(Debug, Default)]
pub struct MapEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&self, name: &str, value: &str) {
        if let Ok(mut vars) = self.vars.write() {
            vars.insert(name.to_uppercase(), value.to_string());
        }
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut vars) = self.vars.write() {
            vars.remove(&name.to_uppercase());
        }
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.read().ok()?.get(&name.to_uppercase()).cloned()
    }
}

/// Replaces every `%NAME%` token whose name resolves in `env`.
///
/// Unresolved tokens are kept as written. When a name does not resolve, its
/// closing `%` may still open the next token, the same way
/// `ExpandEnvironmentStrings` scans.
pub fn expand_env_vars(input: &str, env: &dyn EnvSource) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '%' {
            let mut j = i + 1;
            while j < chars.len() && chars[j] != '%' {
                j += 1;
            }
            if j < chars.len() && j > i + 1 {
                let name: String = chars[i + 1..j].iter().collect();
                if let Some(value) = env.var(&name) {
                    out.push_str(&value);
                    i = j + 1;
                } else {
                    out.push('%');
                    out.push_str(&name);
                    i = j;
                }
                continue;
            }
        }

        out.push(chars[i]);
        i += 1;
    }

    out
}

/// True when `value` contains at least one `%NAME%` token.
pub fn has_env_token(value: &str) -> bool {
    let mut rest = value;
    while let Some(start) = rest.find('%') {
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(0) => rest = after,
            Some(_) => return true,
            None => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_known_names() {
        let env = MapEnv::new().with("SystemRoot", r"C:\Windows");
        assert_eq!(
            expand_env_vars(r"%SystemRoot%\System32", &env),
            r"C:\Windows\System32"
        );
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let env = MapEnv::new().with("USERPROFILE", r"C:\Users\dev");
        assert_eq!(expand_env_vars(r"%UserProfile%\bin", &env), r"C:\Users\dev\bin");
    }

    #[test]
    fn unknown_names_are_left_alone() {
        let env = MapEnv::new();
        assert_eq!(expand_env_vars(r"%NOPE%\bin", &env), r"%NOPE%\bin");
        assert_eq!(expand_env_vars("50%", &env), "50%");
        assert_eq!(expand_env_vars("a%%b", &env), "a%%b");
    }

    #[test]
    fn closing_percent_of_unknown_name_can_open_next_token() {
        let env = MapEnv::new().with("B", "x");
        assert_eq!(expand_env_vars("%A%B%", &env), "%Ax");
    }

    #[test]
    fn process_env_is_consulted() {
        std::env::set_var("PATHEDIT_ENV_TEST_VAR", "from-process");
        assert_eq!(
            expand_env_vars("%PATHEDIT_ENV_TEST_VAR%", &ProcessEnv),
            "from-process"
        );
    }

    #[test]
    fn detects_tokens() {
        assert!(has_env_token(r"%SystemRoot%\System32"));
        assert!(has_env_token(r"C:\a;%X%"));
        assert!(!has_env_token(r"C:\Windows"));
        assert!(!has_env_token("100%"));
        assert!(!has_env_token("%%"));
        assert!(has_env_token("%%X%"));
    }
}
