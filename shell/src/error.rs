//! Error taxonomy of the interpreter.
//!
//! Every variant renders as the single line shown to the user, so the
//! per-turn boundary can report any failure with a plain `eprintln!("{e}")`.

use thiserror::Error;

/// Result type alias used throughout the crate.
pub type ShellResult<T> = Result<T, ShellError>;

/// Failures that can end a single turn of the interpreter.
///
/// None of them are fatal: the read loop reports the message and shows the
/// next prompt.
#[derive(Error, Debug)]
pub enum ShellError {
    /// A single or double quote was opened and never closed.
    #[error("syntax error: unterminated quote")]
    Quote,

    /// The line cannot be realized as a pipeline, or a stage failed to start.
    #[error("pipeline: {0}")]
    Pipeline(String),

    /// `cd` failed.
    #[error("cd: {0}")]
    Cd(String),

    /// `history -r` was pointed at a file that does not exist.
    #[error("history: {0}: No such file or directory")]
    HistoryFile(String),

    /// Any other OS failure while `history` touched a file.
    #[error("history: {0}")]
    History(String),

    /// Neither a builtin nor an executable found on the search path.
    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// A builtin rejected its arguments; carries the parser's message.
    #[error("{0}")]
    Usage(String),

    /// Redirection target or terminal I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ShellError {
    pub(crate) fn pipeline(msg: impl Into<String>) -> Self {
        ShellError::Pipeline(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_single_user_facing_lines() {
        assert_eq!(
            ShellError::CommandNotFound("nonexistent_cmd".into()).to_string(),
            "nonexistent_cmd: command not found"
        );
        assert_eq!(
            ShellError::Cd("/nope: No such file or directory".into()).to_string(),
            "cd: /nope: No such file or directory"
        );
        assert_eq!(
            ShellError::HistoryFile("h.txt".into()).to_string(),
            "history: h.txt: No such file or directory"
        );
        assert_eq!(
            ShellError::pipeline("redirection is only allowed on the last stage").to_string(),
            "pipeline: redirection is only allowed on the last stage"
        );
    }
}
