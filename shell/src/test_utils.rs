//! Helpers shared by the unit tests of several modules.

use crate::env::Environment;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, OnceLock};

/// Serializes tests that change or depend on the process working directory.
pub(crate) fn lock_current_dir() -> MutexGuard<'static, ()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// An environment rooted at `dir` that can still find system tools.
pub(crate) fn env_in(dir: &Path) -> Environment {
    let mut env = Environment::isolated(dir);
    env.set_var("PATH", std::env::var("PATH").unwrap_or_else(|_| "/usr/bin:/bin".into()));
    env.set_var("HOME", dir.to_string_lossy());
    env
}
