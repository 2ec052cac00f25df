use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Empty name: `None`.
/// - Absolute path: returned if it is an executable file.
/// - Relative path with more than one component (`bin/tool`, `./tool`):
///   resolved against `cwd`, returned if it is an executable file.
/// - Single component: each directory of `search_paths` (a `PATH`-style list)
///   is scanned in order and the first executable file named `name` wins.
pub fn find_command_path(search_paths: &OsStr, cwd: &Path, name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return is_executable(path).then(|| path.to_path_buf());
    }

    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => None,
        (Some(single), None) if !name.starts_with("./") => {
            find_in_path(search_paths, cwd, single.as_os_str())
        }
        _ => {
            let candidate = cwd.join(path);
            is_executable(&candidate).then_some(candidate)
        }
    }
}

fn find_in_path(search_paths: &OsStr, cwd: &Path, cmd: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_paths)
        .map(|dir| cwd.join(dir).join(cmd))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Shell-style status code of a finished process.
pub(crate) fn exit_code(exit_status: ExitStatus) -> i32 {
    match exit_status.code() {
        Some(code) => code,
        None => terminated_by_signal(exit_status),
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = exit_status.signal() {
        128 + signal
    } else if exit_status.core_dumped() {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}
