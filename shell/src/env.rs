use crate::external;
use crate::history::{FileStore, HistoryLog, HistoryStore};
use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Mutable state shared by every stage of every turn.
///
/// The environment contains:
/// - `vars`: variables visible to spawned commands and used for `PATH`/`HOME`.
/// - `current_dir`: the working directory builtins report and children start in.
/// - `history`: the session's command log.
/// - `history_store`: where `history -w/-a/-r` and the exit flush go.
///
/// Builtins receive it as `&mut Environment`; nothing here is global.
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
    pub history: HistoryLog,
    pub history_store: Box<dyn HistoryStore>,
}

impl Environment {
    /// Capture the current process state: variables, working directory, an
    /// empty history and the file-backed history store.
    pub fn new() -> Self {
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars: stdenv::vars().collect(),
            current_dir,
            history: HistoryLog::new(),
            history_store: Box::new(FileStore),
        }
    }

    /// An environment with no variables at all, rooted at `current_dir`.
    pub fn isolated(current_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars: HashMap::new(),
            current_dir: current_dir.into(),
            history: HistoryLog::new(),
            history_store: Box::new(FileStore),
        }
    }

    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn home(&self) -> Option<PathBuf> {
        self.get_var("HOME").map(PathBuf::from)
    }

    /// Find the executable `name` would run, searching `PATH` for bare names.
    pub fn resolve_command(&self, name: &str) -> Option<PathBuf> {
        let search_paths = OsString::from(self.get_var("PATH").unwrap_or_default());
        external::find_command_path(&search_paths, &self.current_dir, name)
    }

    /// Expand a leading `~` using this environment's `HOME` and anchor
    /// relative paths at the working directory.
    pub fn expand_path(&self, raw: &str) -> PathBuf {
        let expanded = shellexpand::tilde_with_context(raw, || self.get_var("HOME"));
        self.current_dir.join(Path::new(expanded.as_ref()))
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_set_and_get_var() {
        let mut env = Environment::isolated("/");

        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");

        assert_eq!(env.get_var("KEY"), Some("VALUE".to_string()));
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
    }

    #[test]
    fn expand_path_uses_own_home_and_cwd() {
        let mut env = Environment::isolated("/work");
        env.set_var("HOME", "/home/someone");

        assert_eq!(
            env.expand_path("~/.shell_history"),
            Path::new("/home/someone/.shell_history")
        );
        assert_eq!(env.expand_path("h.txt"), Path::new("/work/h.txt"));
        assert_eq!(env.expand_path("/abs/h.txt"), Path::new("/abs/h.txt"));
    }

    #[test]
    fn expand_path_keeps_tilde_without_home() {
        let env = Environment::isolated("/work");
        assert_eq!(env.expand_path("~/h.txt"), Path::new("/work/~/h.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn resolve_command_uses_path_variable() {
        let mut env = Environment::isolated("/");
        assert_eq!(env.resolve_command("sh"), None);

        env.set_var("PATH", "/bin");
        assert_eq!(env.resolve_command("sh"), Some(PathBuf::from("/bin/sh")));
    }
}
