//! Runs a classified [`Pipeline`]: builtins in-process, everything else as
//! child processes, wired together left to right.
//!
//! Stage `i` is fully wired before stage `i + 1` is set up. Children run
//! concurrently and are all waited for before [`run_pipeline`] returns, on
//! every exit path, including a spawn failure halfway through.

use crate::builtin::BuiltinResult;
use crate::command::{CommandKind, ExitCode, Pipeline, Stage};
use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use crate::external;
use crate::io_adapters::Console;
use crate::parser::Position;
use crate::redirect::Stream;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::{self, JoinHandle};

/// Transport carrying one stage's output onward.
enum StageLink {
    /// Live stdout of an external stage.
    Pipe(ChildStdout),
    /// Output of a builtin, already complete.
    Buffer(Vec<u8>),
    /// Redirection target of the last stage.
    File(File),
}

impl StageLink {
    /// Turns the link into a child's stdio handle, plus the bytes that still
    /// have to be written into it.
    fn into_stdio(self) -> (Stdio, Option<Vec<u8>>) {
        match self {
            StageLink::Pipe(out) => (Stdio::from(out), None),
            StageLink::Buffer(bytes) => (Stdio::piped(), Some(bytes)),
            StageLink::File(file) => (Stdio::from(file), None),
        }
    }
}

/// Where a stage's stdout goes.
enum Destination {
    /// The console; for external stages either inherited or captured.
    Terminal,
    /// Last stage with a stdout redirection.
    Redirected(StageLink),
    /// The next stage.
    Next,
    /// Dropped: an external stage followed by a builtin, which never reads.
    Discard,
}

/// What a finished turn reports back to the read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    /// Status of the last stage.
    pub exit_code: ExitCode,
    /// `exit` ran as the only stage of the line.
    pub terminate: bool,
}

/// Children and feeder threads started so far in this turn.
#[derive(Default)]
struct Running {
    children: Vec<(String, Child)>,
    feeders: Vec<JoinHandle<io::Result<()>>>,
    /// Stdout of the last stage when the console cannot be inherited.
    captured: Option<ChildStdout>,
}

impl Running {
    /// Drains captured output, then joins every child and feeder. Returns the
    /// status of the last child, if it was the last stage.
    fn finish(mut self, console: &mut dyn Console) -> Option<ExitCode> {
        if let Some(mut out) = self.captured.take() {
            if let Err(e) = io::copy(&mut out, console.out()) {
                log::warn!("failed to copy pipeline output: {e}");
            }
        }

        let mut last = None;
        for (name, mut child) in self.children {
            match child.wait() {
                Ok(status) => {
                    let code = external::exit_code(status);
                    log::info!("{name} (pid {}) exited with {code}", child.id());
                    last = Some(code);
                }
                Err(e) => log::warn!("failed to wait for {name}: {e}"),
            }
        }

        for feeder in self.feeders {
            match feeder.join() {
                Ok(Ok(())) => {}
                // The reader is allowed to exit without consuming its input.
                Ok(Err(e)) if e.kind() == io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => log::warn!("failed to feed stage input: {e}"),
                Err(_) => log::warn!("stage input feeder panicked"),
            }
        }
        last
    }
}

/// Executes `pipeline` to completion.
pub fn run_pipeline(
    pipeline: &Pipeline,
    env: &mut Environment,
    console: &mut dyn Console,
) -> ShellResult<Outcome> {
    let mut running = Running::default();
    let result = Executor {
        pipeline,
        env,
        running: &mut running,
        terminal: console.is_terminal(),
    }
    .run(console);
    let last_child = running.finish(console);

    let mut outcome = result?;
    if !pipeline.stages.last().is_some_and(Stage::is_internal) {
        outcome.exit_code = last_child.unwrap_or(outcome.exit_code);
    }
    console.out().flush()?;
    Ok(outcome)
}

struct Executor<'a> {
    pipeline: &'a Pipeline,
    env: &'a mut Environment,
    running: &'a mut Running,
    terminal: bool,
}

impl Executor<'_> {
    fn run(&mut self, console: &mut dyn Console) -> ShellResult<Outcome> {
        let pipeline = self.pipeline;
        let stages = &pipeline.stages;
        let mut incoming: Option<StageLink> = None;
        let mut outcome = Outcome {
            exit_code: 0,
            terminate: false,
        };

        for (index, stage) in stages.iter().enumerate() {
            let position = pipeline.position(index);
            let destination = self.destination(position, stages.get(index + 1))?;

            match &stage.kind {
                CommandKind::Internal(builtin) => {
                    // Builtins never read stdin; dropping a pipe here lets the
                    // writer see EOF/EPIPE instead of blocking.
                    drop(incoming.take());
                    let result = match builtin.run(stage.args(), self.env) {
                        Ok(result) => result,
                        Err(e) => return self.builtin_failed(e, position, destination),
                    };
                    outcome.terminate = result.terminates_shell && position == Position::Only;
                    incoming = self.deliver(&result, destination, console)?;
                }
                CommandKind::External(path) => {
                    incoming = self.spawn(stage, path, position, incoming.take(), destination)?;
                }
            }
        }
        Ok(outcome)
    }

    /// Decides where stage `position`'s stdout goes. Opens the redirection
    /// target for the last stage even if nothing will be written to it.
    fn destination(&self, position: Position, next: Option<&Stage>) -> ShellResult<Destination> {
        if let Some(next) = next {
            return Ok(if next.is_internal() {
                Destination::Discard
            } else {
                Destination::Next
            });
        }

        let Some(redirection) = &self.pipeline.redirection else {
            return Ok(Destination::Terminal);
        };
        let file = redirection.open(&self.env.current_dir)?;
        log::debug!("redirecting {:?} of last stage to {}", redirection.stream, redirection.target);
        Ok(match redirection.stream {
            Stream::Stdout => Destination::Redirected(StageLink::File(file)),
            // Only a single command gets its stderr redirected; in a pipeline
            // the file is merely created.
            Stream::Stderr if position == Position::Only => {
                Destination::Redirected(StageLink::File(file))
            }
            Stream::Stderr => Destination::Terminal,
        })
    }

    fn stderr_redirected(&self) -> bool {
        self.pipeline.stages.len() == 1
            && self
                .pipeline
                .redirection
                .as_ref()
                .is_some_and(|r| r.stream == Stream::Stderr)
    }

    /// Routes a builtin's result to `destination`; returns the link for the
    /// next stage.
    fn deliver(
        &self,
        result: &BuiltinResult,
        destination: Destination,
        console: &mut dyn Console,
    ) -> ShellResult<Option<StageLink>> {
        let payload = result.payload();
        match destination {
            Destination::Next | Destination::Discard => Ok(Some(StageLink::Buffer(payload))),
            // Silent builtins print nothing, not even a blank line.
            _ if result.text.is_none() => Ok(None),
            Destination::Redirected(StageLink::File(_)) if self.stderr_redirected() => {
                console.out().write_all(&payload)?;
                Ok(None)
            }
            Destination::Redirected(StageLink::File(mut file)) => {
                file.write_all(&payload)?;
                Ok(None)
            }
            Destination::Redirected(_) | Destination::Terminal => {
                console.out().write_all(&payload)?;
                Ok(None)
            }
        }
    }

    /// A lone builtin with `2>` reports its error into the file; anywhere
    /// else the error aborts the line.
    fn builtin_failed(
        &self,
        error: ShellError,
        position: Position,
        destination: Destination,
    ) -> ShellResult<Outcome> {
        match destination {
            Destination::Redirected(StageLink::File(mut file))
                if position == Position::Only && self.stderr_redirected() =>
            {
                writeln!(file, "{error}")?;
                Ok(Outcome {
                    exit_code: 1,
                    terminate: false,
                })
            }
            _ => Err(error),
        }
    }

    fn spawn(
        &mut self,
        stage: &Stage,
        path: &Path,
        position: Position,
        incoming: Option<StageLink>,
        destination: Destination,
    ) -> ShellResult<Option<StageLink>> {
        let mut cmd = Command::new(path);
        cmd.args(stage.args())
            .envs(&self.env.vars)
            .current_dir(&self.env.current_dir);

        let (stdin, payload) = match incoming {
            Some(link) => link.into_stdio(),
            None if position.is_first() && self.terminal => (Stdio::inherit(), None),
            None => (Stdio::null(), None),
        };
        cmd.stdin(stdin);

        let mut capture = false;
        match destination {
            Destination::Next => {
                cmd.stdout(Stdio::piped());
            }
            Destination::Discard => {
                cmd.stdout(Stdio::null());
            }
            Destination::Redirected(StageLink::File(file)) if self.stderr_redirected() => {
                cmd.stderr(file);
                capture = !self.terminal;
            }
            Destination::Redirected(link) => {
                let (stdout, _) = link.into_stdio();
                cmd.stdout(stdout);
            }
            Destination::Terminal => {
                capture = !self.terminal;
            }
        }
        if capture {
            cmd.stdout(Stdio::piped());
        }

        let mut child = cmd.spawn().map_err(|e| {
            ShellError::pipeline(format!("{}: failed to start: {e}", stage.name()))
        })?;
        // Releases the parent's copies of the stdin/stdout handles.
        drop(cmd);
        log::info!("spawned {} (pid {})", path.display(), child.id());

        if let Some(bytes) = payload {
            if let Some(mut stdin) = child.stdin.take() {
                // Written from a thread so a large payload cannot deadlock
                // against a child that is itself blocked on output.
                self.running
                    .feeders
                    .push(thread::spawn(move || stdin.write_all(&bytes)));
            }
        }

        let outgoing = if capture {
            self.running.captured = child.stdout.take();
            None
        } else {
            child.stdout.take().map(StageLink::Pipe)
        };
        self.running
            .children
            .push((stage.name().to_string(), child));
        Ok(outgoing)
    }
}
