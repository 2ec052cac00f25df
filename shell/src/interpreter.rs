use crate::command::{self, ExitCode};
use crate::config::Config;
use crate::env::Environment;
use crate::error::ShellResult;
use crate::history;
use crate::io_adapters::{Console, StdConsole};
use crate::parser;
use crate::pipeline::{self, Outcome};
use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, Result};
use std::path::PathBuf;

/// What the read loop should do after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Show the next prompt. Carries the status of the line.
    Continue(ExitCode),
    /// `exit` ran; history must be flushed and the loop left.
    Exit,
}

/// A line-at-a-time command interpreter.
///
/// Each call to [`Interpreter::execute_line`] is one turn: the line is
/// recorded in the history, tokenized, split into stages, classified and run
/// to completion. Errors are reported as a single line on the console's error
/// stream and never end the session.
///
/// Example
/// ```
/// use shell_commands::{Interpreter, MemConsole};
/// let mut sh = Interpreter::default();
/// let mut console = MemConsole::new();
/// sh.execute_line("echo hello world", &mut console);
/// assert_eq!(console.out_str(), "hello world\n");
/// ```
pub struct Interpreter {
    env: Environment,
    history_file: Option<PathBuf>,
}

impl Interpreter {
    /// An interpreter over `env`, loading start-up history from
    /// `history_file` when one is given.
    pub fn new(mut env: Environment, history_file: Option<PathBuf>) -> Self {
        if let Some(path) = &history_file {
            env.history = history::load_or_empty(env.history_store.as_ref(), path);
        }
        Self { env, history_file }
    }

    /// An interpreter over the process environment, configured by `config`.
    pub fn from_config(config: &Config) -> Self {
        let env = Environment::new();
        let history_file = config
            .history_file
            .as_deref()
            .map(|raw| env.expand_path(raw));
        Self::new(env, history_file)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Runs one input line as a full turn.
    pub fn execute_line(&mut self, line: &str, console: &mut dyn Console) -> Flow {
        if !line.trim().is_empty() {
            self.env.history.push(line);
        }

        match self.run_line(line, console) {
            Ok(Outcome {
                terminate: true, ..
            }) => Flow::Exit,
            Ok(outcome) => Flow::Continue(outcome.exit_code),
            Err(e) => {
                log::debug!("line {line:?} failed: {e:?}");
                if let Err(write_err) = writeln!(console.err(), "{e}") {
                    log::warn!("failed to report error: {write_err}");
                }
                Flow::Continue(1)
            }
        }
    }

    fn run_line(&mut self, line: &str, console: &mut dyn Console) -> ShellResult<Outcome> {
        let Some(parsed) = parser::parse_line(line)? else {
            return Ok(Outcome {
                exit_code: 0,
                terminate: false,
            });
        };
        let pipeline = command::plan(parsed, &self.env)?;
        pipeline::run_pipeline(&pipeline, &mut self.env, console)
    }

    /// Appends the entries recorded since the last save to the history file.
    pub fn shutdown(&mut self) {
        if let Some(path) = &self.history_file {
            history::flush_unpersisted(&mut self.env.history, self.env.history_store.as_ref(), path);
        }
    }

    /// Interactive read-eval-print loop on the terminal.
    ///
    /// Ctrl-C discards the current line. End of input behaves like `exit`.
    pub fn repl(&mut self, prompt: &str) -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        for entry in self.env.history.entries() {
            rl.add_history_entry(entry.as_str())?;
        }
        let mut console = StdConsole::new();

        let result = loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        if let Err(e) = rl.add_history_entry(line.as_str()) {
                            log::warn!("line editor rejected history entry: {e}");
                        }
                    }
                    if self.execute_line(&line, &mut console) == Flow::Exit {
                        break Ok(());
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break Ok(()),
                Err(err) => break Err(err),
            }
        };

        self.shutdown();
        result
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Environment::new(), None)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::io_adapters::MemConsole;
    use crate::test_utils::env_in;
    use std::fs;
    use tempfile::TempDir;

    fn shell(dir: &TempDir) -> Interpreter {
        Interpreter::new(env_in(dir.path()), None)
    }

    fn run(sh: &mut Interpreter, line: &str) -> (Flow, MemConsole) {
        let mut console = MemConsole::new();
        let flow = sh.execute_line(line, &mut console);
        (flow, console)
    }

    #[test]
    fn echo_through_external_pipeline() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);
        let (flow, console) = run(&mut sh, "echo \"hello   world\" | cat | wc -w");
        assert_eq!(flow, Flow::Continue(0));
        assert_eq!(console.out_str().trim(), "2");
        assert_eq!(console.err_str(), "");
    }

    #[test]
    fn unknown_command_is_reported_and_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);
        let (flow, console) = run(&mut sh, "nonexistent_cmd");
        assert_eq!(flow, Flow::Continue(1));
        assert_eq!(console.err_str(), "nonexistent_cmd: command not found\n");
        assert_eq!(console.out_str(), "");

        let (flow, console) = run(&mut sh, "pwd");
        assert_eq!(flow, Flow::Continue(0));
        assert!(!console.out_str().is_empty());
    }

    #[test]
    fn unterminated_quote_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);
        let (_, console) = run(&mut sh, "echo 'oops");
        assert_eq!(console.err_str(), "syntax error: unterminated quote\n");
    }

    #[test]
    fn blank_lines_are_not_recorded() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);
        assert_eq!(run(&mut sh, "   ").0, Flow::Continue(0));
        run(&mut sh, "echo a");
        run(&mut sh, "");
        let (_, console) = run(&mut sh, "history");
        assert_eq!(console.out_str(), "   1  echo a\n   2  history\n");
    }

    #[test]
    fn failed_lines_are_still_recorded() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);
        run(&mut sh, "nonexistent_cmd");
        run(&mut sh, "echo 'x");
        let (_, console) = run(&mut sh, "history 2");
        assert_eq!(console.out_str(), "   2  echo 'x\n   3  history 2\n");
    }

    #[test]
    fn redirection_writes_file_not_console() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);
        let (_, console) = run(&mut sh, "echo hi > out.txt");
        assert_eq!(console.out_str(), "");
        assert_eq!(fs::read_to_string(dir.path().join("out.txt")).unwrap(), "hi\n");
    }

    #[test]
    fn exit_alone_ends_the_session() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);
        assert_eq!(run(&mut sh, "exit").0, Flow::Exit);
        assert_eq!(run(&mut sh, "exit 3").0, Flow::Exit);
        assert_eq!(run(&mut sh, "echo x | exit").0, Flow::Continue(0));
    }

    #[test]
    fn exit_status_of_last_stage() {
        let dir = TempDir::new().unwrap();
        let mut sh = shell(&dir);
        assert_eq!(run(&mut sh, "false").0, Flow::Continue(1));
        assert_eq!(run(&mut sh, "false | true").0, Flow::Continue(0));
    }

    #[test]
    fn history_file_is_loaded_and_appended() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hist");
        fs::write(&path, "ls\n\n  pwd  \n").unwrap();

        let mut sh = Interpreter::new(env_in(dir.path()), Some(path.clone()));
        assert_eq!(sh.env().history.entries(), ["ls", "pwd"]);
        assert_eq!(sh.env().history.last_persisted_index(), 2);

        run(&mut sh, "echo new");
        sh.shutdown();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ls\n\n  pwd  \necho new\n");

        // Nothing new to append the second time.
        sh.shutdown();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ls\n\n  pwd  \necho new\n");
    }

    #[test]
    fn missing_history_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let sh = Interpreter::new(env_in(dir.path()), Some(dir.path().join("absent")));
        assert!(sh.env().history.is_empty());
    }
}
