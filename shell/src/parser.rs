//! Turns a raw command line into its stages and optional redirection.
//!
//! Order matters: the redirection is cut off the raw text first, then the
//! remainder is split on `|`, and only then is each stage tokenized. Both cuts
//! work on raw text, so a `|` or `>` inside quotes is still treated as an
//! operator.

use crate::error::{ShellError, ShellResult};
use crate::lexer;
use crate::redirect::{self, Redirection};

/// Where a stage sits inside its pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Sole stage of a line without `|`.
    Only,
    First,
    Middle,
    Last,
}

impl Position {
    pub fn of(index: usize, len: usize) -> Self {
        match (index, len) {
            (_, 1) => Position::Only,
            (0, _) => Position::First,
            (i, n) if i + 1 == n => Position::Last,
            _ => Position::Middle,
        }
    }

    pub fn is_first(self) -> bool {
        matches!(self, Position::Only | Position::First)
    }

    pub fn is_last(self) -> bool {
        matches!(self, Position::Only | Position::Last)
    }
}

/// A syntactically valid command line: at least one stage, each with at least
/// one word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub stages: Vec<Vec<String>>,
    /// Applies to the last stage only.
    pub redirection: Option<Redirection>,
}

/// Splits `text` on every `|`.
///
/// Blank segments are dropped. A line that contained `|` must still have two
/// stages afterwards, and any line must have at least one.
pub fn split_pipeline(text: &str) -> ShellResult<Vec<&str>> {
    let segments: Vec<&str> = text
        .split('|')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();

    match segments.len() {
        0 => Err(ShellError::pipeline("missing command")),
        1 if text.contains('|') => Err(ShellError::pipeline(
            "a pipeline needs at least 2 commands",
        )),
        _ => Ok(segments),
    }
}

/// Parses one line of input. Returns `None` for a blank line.
pub fn parse_line(line: &str) -> ShellResult<Option<ParsedLine>> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (residual, redirection) = redirect::resolve_redirection(line)?;
    let stages = split_pipeline(&residual)?
        .into_iter()
        .map(lexer::tokenize)
        .collect::<ShellResult<Vec<_>>>()?;

    Ok(Some(ParsedLine {
        stages,
        redirection,
    }))
}
