use std::io::{self, Write};

/// The user-facing end of a turn: where final output and error messages go.
pub trait Console {
    fn out(&mut self) -> &mut dyn Write;

    fn err(&mut self) -> &mut dyn Write;

    /// Whether spawned processes may inherit the real terminal streams.
    ///
    /// When `false`, the executor gives the first stage an empty stdin and
    /// copies the last stage's stdout into [`Console::out`] itself.
    fn is_terminal(&self) -> bool;
}

/// The process's own stdout and stderr.
pub struct StdConsole {
    out: io::Stdout,
    err: io::Stderr,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            out: io::stdout(),
            err: io::stderr(),
        }
    }
}

impl Default for StdConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for StdConsole {
    fn out(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    fn err(&mut self) -> &mut dyn Write {
        &mut self.err
    }

    fn is_terminal(&self) -> bool {
        true
    }
}

/// Memory-backed console, used to embed the interpreter and in tests.
#[derive(Debug, Default)]
pub struct MemConsole {
    pub out: Vec<u8>,
    pub err: Vec<u8>,
}

impl MemConsole {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn out_str(&self) -> String {
        String::from_utf8_lossy(&self.out).into_owned()
    }

    pub fn err_str(&self) -> String {
        String::from_utf8_lossy(&self.err).into_owned()
    }
}

impl Console for MemConsole {
    fn out(&mut self) -> &mut dyn Write {
        &mut self.out
    }

    fn err(&mut self) -> &mut dyn Write {
        &mut self.err
    }

    fn is_terminal(&self) -> bool {
        false
    }
}
