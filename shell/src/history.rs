//! The in-memory command log and its persistence hook.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// Append-only record of accepted command lines.
///
/// `persisted` counts how many leading entries are already known to be on
/// disk; `history -a` and the exit-time flush only write entries past it.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Vec<String>,
    persisted: usize,
}

impl HistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A log seeded from disk: every loaded entry counts as persisted.
    pub fn with_loaded(entries: Vec<String>) -> Self {
        let persisted = entries.len();
        Self { entries, persisted }
    }

    pub fn push(&mut self, line: impl Into<String>) {
        self.entries.push(line.into());
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_persisted_index(&self) -> usize {
        self.persisted
    }

    pub fn unpersisted(&self) -> &[String] {
        &self.entries[self.persisted..]
    }

    pub fn mark_persisted(&mut self) {
        self.persisted = self.entries.len();
    }

    /// Appends each line not already present verbatim. Returns how many were
    /// added.
    pub fn merge<I>(&mut self, lines: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        let before = self.entries.len();
        for line in lines {
            if !self.entries.contains(&line) {
                self.entries.push(line);
            }
        }
        self.entries.len() - before
    }

    /// Formats the last `limit` entries (all of them for `None`) as
    /// `"{index:>4}  {line}"` rows, numbered by their 1-based position in
    /// the whole log.
    pub fn render(&self, limit: Option<usize>) -> String {
        let start = limit.map_or(0, |n| self.entries.len().saturating_sub(n));
        self.entries[start..]
            .iter()
            .enumerate()
            .map(|(offset, line)| format!("{:>4}  {}", start + offset + 1, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Where history lines are persisted.
///
/// Implementations report raw I/O errors; callers decide whether to surface
/// them (the `history` builtin) or swallow them (start-up and exit).
pub trait HistoryStore {
    /// Reads all non-blank lines, trimmed.
    fn load_lines(&self, path: &Path) -> io::Result<Vec<String>>;
    fn append_lines(&self, path: &Path, lines: &[String]) -> io::Result<()>;
    fn overwrite_lines(&self, path: &Path, lines: &[String]) -> io::Result<()>;
}

/// One entry per line in a plain text file.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileStore;

impl HistoryStore for FileStore {
    fn load_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        let content = fs::read_to_string(path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn append_lines(&self, path: &Path, lines: &[String]) -> io::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        write_lines(file, lines)
    }

    fn overwrite_lines(&self, path: &Path, lines: &[String]) -> io::Result<()> {
        write_lines(fs::File::create(path)?, lines)
    }
}

fn write_lines(file: fs::File, lines: &[String]) -> io::Result<()> {
    let mut out = io::BufWriter::new(file);
    for line in lines {
        writeln!(out, "{line}")?;
    }
    out.flush()
}

/// Loads the start-up history. A missing or unreadable file yields an empty
/// log.
pub fn load_or_empty(store: &dyn HistoryStore, path: &Path) -> HistoryLog {
    match store.load_lines(path) {
        Ok(lines) => {
            log::info!("loaded {} history entries from {}", lines.len(), path.display());
            HistoryLog::with_loaded(lines)
        }
        Err(e) => {
            log::debug!("no history loaded from {}: {e}", path.display());
            HistoryLog::new()
        }
    }
}

/// Appends the entries added since the last write. Failures are logged and
/// otherwise ignored.
pub fn flush_unpersisted(log: &mut HistoryLog, store: &dyn HistoryStore, path: &Path) {
    match store.append_lines(path, log.unpersisted()) {
        Ok(()) => log.mark_persisted(),
        Err(e) => log::warn!("failed to save history to {}: {e}", path.display()),
    }
}
