use std::collections::HashMap;
use std::env as stdenv;
use std::path::PathBuf;

/// Session-level view of the process environment.
///
/// The environment contains:
/// - `vars`: variables visible to `\e` lookups and to spawned programs.
/// - `current_dir`: the working directory external commands are started in.
///
/// Fields are public so tests can build an environment with an explicit
/// variable map instead of touching the real process environment.
#[derive(Debug, Clone)]
pub struct Environment {
    /// Key-value store of environment variables (e.g., PATH, HOME).
    pub vars: HashMap<String, String>,
    /// The working directory for spawned programs.
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process state into a new `Environment`.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Build an environment that only knows about the given variables.
    pub fn with_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            current_dir: stdenv::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Get the value of an environment variable.
    ///
    /// An unbound name is `None`, never an error.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    /// Set or override an environment variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
