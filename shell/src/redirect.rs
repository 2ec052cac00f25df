use crate::error::{ShellError, ShellResult};
use crate::lexer;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

/// Which output stream of the final stage is sent to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// How the target file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Truncate,
    Append,
}

/// A parsed `>`-style redirection. At most one exists per command line and it
/// always applies to the last stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub stream: Stream,
    pub mode: Mode,
    /// Never empty.
    pub target: String,
}

/// Operators in the order they are searched for: longer operators first, so
/// `2>>` is never mistaken for `2>` or `>>`.
const OPERATORS: [(&str, Stream, Mode); 6] = [
    ("2>>", Stream::Stderr, Mode::Append),
    ("1>>", Stream::Stdout, Mode::Append),
    (">>", Stream::Stdout, Mode::Append),
    ("2>", Stream::Stderr, Mode::Truncate),
    ("1>", Stream::Stdout, Mode::Truncate),
    (">", Stream::Stdout, Mode::Truncate),
];

impl Redirection {
    /// Opens the target, creating it if needed. Relative targets are resolved
    /// against `cwd`.
    ///
    /// The file is opened even when nothing will be written to it, so `> f`
    /// always leaves an existing (possibly truncated) `f` behind.
    pub fn open(&self, cwd: &Path) -> ShellResult<File> {
        let path = cwd.join(&self.target);
        let mut options = OpenOptions::new();
        options.create(true);
        match self.mode {
            Mode::Truncate => options.write(true).truncate(true),
            Mode::Append => options.append(true),
        };
        options.open(&path).map_err(|e| {
            ShellError::Io(io::Error::new(e.kind(), format!("{}: {}", self.target, e)))
        })
    }
}

/// Strips the redirection operator and its target from `line`.
///
/// The first operator of [`OPERATORS`] that occurs anywhere in the line wins,
/// split at its leftmost occurrence. Only the first word after it is the
/// target; anything following that word is ignored. Returns the trimmed text
/// before the operator.
///
/// The scan is not quote-aware: a `>` inside quotes is still an operator.
pub fn resolve_redirection(line: &str) -> ShellResult<(String, Option<Redirection>)> {
    let Some((op, stream, mode, idx)) = OPERATORS
        .iter()
        .find_map(|&(op, stream, mode)| line.find(op).map(|idx| (op, stream, mode, idx)))
    else {
        return Ok((line.trim().to_string(), None));
    };

    let (command, rest) = (&line[..idx], &line[idx + op.len()..]);
    if rest.contains('|') {
        return Err(ShellError::pipeline(
            "redirection is only allowed on the last stage",
        ));
    }

    let target = lexer::tokenize(rest)?
        .into_iter()
        .next()
        .filter(|word| !word.is_empty())
        .ok_or_else(|| ShellError::pipeline(format!("missing file name after `{op}`")))?;

    Ok((
        command.trim().to_string(),
        Some(Redirection {
            stream,
            mode,
            target,
        }),
    ))
}
