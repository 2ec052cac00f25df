use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// History file used by `history -w/-a/-r` when no file is given.
pub const DEFAULT_HISTORY_FILE: &str = "~/.shell_history";

/// What every builtin hands back, wherever its output ends up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuiltinResult {
    /// One output "line" (may itself contain newlines), or `None` when the
    /// command prints nothing at all.
    pub text: Option<String>,
    /// Set by `exit`.
    pub terminates_shell: bool,
}

impl BuiltinResult {
    pub fn output(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            terminates_shell: false,
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn exit() -> Self {
        Self {
            text: None,
            terminates_shell: true,
        }
    }

    /// The bytes handed to the next stage: text plus newline. A silent result
    /// still hands on a lone newline, although it prints nothing when it is
    /// the last stage.
    pub fn payload(&self) -> Vec<u8> {
        format!("{}\n", self.text.as_deref().unwrap_or_default()).into_bytes()
    }
}

/// Closed set of commands implemented inside the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    Echo,
    Type,
    Pwd,
    Cd,
    History,
}

impl Builtin {
    pub const ALL: [Builtin; 6] = [
        Builtin::Exit,
        Builtin::Echo,
        Builtin::Type,
        Builtin::Pwd,
        Builtin::Cd,
        Builtin::History,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|builtin| builtin.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Exit => Exit::name(),
            Builtin::Echo => Echo::name(),
            Builtin::Type => Type::name(),
            Builtin::Pwd => Pwd::name(),
            Builtin::Cd => Cd::name(),
            Builtin::History => History::name(),
        }
    }

    /// Parses `args` for this builtin and runs it against `env`.
    pub fn run(self, args: &[String], env: &mut Environment) -> ShellResult<BuiltinResult> {
        log::debug!("builtin {} {:?}", self.name(), args);
        match self {
            Builtin::Exit => invoke::<Exit>(args, env),
            Builtin::Echo => invoke::<Echo>(args, env),
            Builtin::Type => invoke::<Type>(args, env),
            Builtin::Pwd => invoke::<Pwd>(args, env),
            Builtin::Cd => invoke::<Cd>(args, env),
            Builtin::History => invoke::<History>(args, env),
        }
    }
}

/// A builtin's argument structure plus its behavior.
///
/// Arguments are parsed with [`argh`]; `--help` is answered by argh itself.
/// Handlers never read stdin and never block.
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    fn name() -> &'static str;

    fn execute(self, env: &mut Environment) -> ShellResult<BuiltinResult>;
}

fn invoke<T: BuiltinCommand>(args: &[String], env: &mut Environment) -> ShellResult<BuiltinResult> {
    let args: Vec<&str> = args.iter().map(String::as_str).collect();
    match T::from_args(&[T::name()], &args) {
        Ok(cmd) => cmd.execute(env),
        Err(EarlyExit {
            output,
            status: Ok(()),
        }) => Ok(BuiltinResult::output(output.trim_end())),
        Err(EarlyExit {
            output,
            status: Err(()),
        }) => {
            let reason = output.lines().next().unwrap_or("invalid arguments");
            Err(ShellError::Usage(format!("{}: {}", T::name(), reason)))
        }
    }
}

#[derive(FromArgs)]
/// Print the current working directory.
pub struct Pwd {
    #[argh(positional, greedy)]
    /// ignored.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Pwd {
    fn name() -> &'static str {
        "pwd"
    }

    fn execute(self, env: &mut Environment) -> ShellResult<BuiltinResult> {
        Ok(BuiltinResult::output(env.current_dir.to_string_lossy()))
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Does nothing when no target is given.
pub struct Cd {
    #[argh(positional, greedy)]
    /// directory to switch to; absolute, relative to the current directory, or `~` for $HOME. Further words are ignored.
    pub args: Vec<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn execute(self, env: &mut Environment) -> ShellResult<BuiltinResult> {
        let Some(target) = self.args.into_iter().next() else {
            return Ok(BuiltinResult::silent());
        };

        let target = if target == "~" {
            env.home()
                .ok_or_else(|| ShellError::Cd("HOME not set".to_string()))?
        } else {
            PathBuf::from(target)
        };

        let shown = target.display().to_string();
        let canonical = fs::canonicalize(env.current_dir.join(&target)).map_err(|e| {
            match e.kind() {
                io::ErrorKind::NotFound => {
                    ShellError::Cd(format!("{shown}: No such file or directory"))
                }
                _ => ShellError::Cd(format!("{shown}: {e}")),
            }
        })?;

        env::set_current_dir(&canonical).map_err(|e| ShellError::Cd(format!("{shown}: {e}")))?;
        env.current_dir = canonical;
        Ok(BuiltinResult::silent())
    }
}

#[derive(FromArgs)]
/// Exit the shell, saving unsaved history first.
pub struct Exit {
    #[argh(positional, greedy)]
    /// ignored; the shell always exits with status 0.
    pub _args: Vec<String>,
}

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn execute(self, _env: &mut Environment) -> ShellResult<BuiltinResult> {
        Ok(BuiltinResult::exit())
    }
}

/// Write the arguments separated by single spaces.
///
/// Takes every argument verbatim, options included, so argument parsing is
/// done by hand instead of derived.
pub struct Echo {
    pub args: Vec<String>,
}

impl FromArgs for Echo {
    fn from_args(_command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Echo {
            args: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }
}

impl BuiltinCommand for Echo {
    fn name() -> &'static str {
        "echo"
    }

    fn execute(self, _env: &mut Environment) -> ShellResult<BuiltinResult> {
        Ok(BuiltinResult::output(self.args.join(" ")))
    }
}

#[derive(FromArgs)]
/// Tell whether each name is a shell builtin or an executable on PATH.
pub struct Type {
    #[argh(positional, greedy)]
    /// command names to look up.
    pub names: Vec<String>,
}

impl BuiltinCommand for Type {
    fn name() -> &'static str {
        "type"
    }

    fn execute(self, env: &mut Environment) -> ShellResult<BuiltinResult> {
        if self.names.is_empty() {
            return Ok(BuiltinResult::silent());
        }
        let lines: Vec<String> = self
            .names
            .iter()
            .map(|name| {
                if Builtin::from_name(name).is_some() {
                    format!("{name} is a shell builtin")
                } else if let Some(path) = env.resolve_command(name) {
                    format!("{name} is {}", path.display())
                } else {
                    format!("{name}: not found")
                }
            })
            .collect();
        Ok(BuiltinResult::output(lines.join("\n")))
    }
}

/// What `history` was asked to do, chosen by its first argument alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryAction {
    /// `-w [FILE]`
    Write(Option<String>),
    /// `-a [FILE]`
    Append(Option<String>),
    /// `-r [FILE]`
    Read(Option<String>),
    /// `[N]`; anything that is not a number shows everything.
    Show(Option<String>),
}

/// Display the command history, or save/load it with -w, -a and -r.
///
/// Only the first argument is looked at to pick the action, so flags do not
/// combine. Words after the file name are ignored.
pub struct History {
    pub action: HistoryAction,
}

impl FromArgs for History {
    fn from_args(command_name: &[&str], args: &[&str]) -> Result<Self, EarlyExit> {
        let operand = args.get(1).map(|arg| arg.to_string());
        let action = match args.first().copied() {
            Some("--help") => {
                return Err(EarlyExit {
                    output: history_help(&command_name.join(" ")),
                    status: Ok(()),
                });
            }
            Some("-w") => HistoryAction::Write(operand),
            Some("-a") => HistoryAction::Append(operand),
            Some("-r") => HistoryAction::Read(operand),
            other => HistoryAction::Show(other.map(str::to_string)),
        };
        Ok(History { action })
    }
}

fn history_help(name: &str) -> String {
    format!(
        "Usage: {name} [N]\n       {name} -w|-a|-r [FILE]\n\n\
         Display the command history, or save/load it.\n\n\
         Options:\n  \
         -w  overwrite FILE with the whole history\n  \
         -a  append the entries not yet saved to FILE\n  \
         -r  read FILE and append entries not already in the history\n\n\
         FILE defaults to {DEFAULT_HISTORY_FILE}."
    )
}

fn history_failed(path: &Path, e: io::Error) -> ShellError {
    ShellError::History(format!("{}: {e}", path.display()))
}

impl BuiltinCommand for History {
    fn name() -> &'static str {
        "history"
    }

    fn execute(self, env: &mut Environment) -> ShellResult<BuiltinResult> {
        let file_path = |env: &Environment, file: Option<String>| {
            env.expand_path(file.as_deref().unwrap_or(DEFAULT_HISTORY_FILE))
        };

        match self.action {
            HistoryAction::Write(file) => {
                let path = file_path(env, file);
                env.history_store
                    .overwrite_lines(&path, env.history.entries())
                    .map_err(|e| history_failed(&path, e))?;
                env.history.mark_persisted();
                Ok(BuiltinResult::silent())
            }
            HistoryAction::Append(file) => {
                let path = file_path(env, file);
                env.history_store
                    .append_lines(&path, env.history.unpersisted())
                    .map_err(|e| history_failed(&path, e))?;
                env.history.mark_persisted();
                Ok(BuiltinResult::silent())
            }
            HistoryAction::Read(file) => {
                let path = file_path(env, file);
                let lines = env.history_store.load_lines(&path).map_err(|e| match e.kind() {
                    io::ErrorKind::NotFound => ShellError::HistoryFile(path.display().to_string()),
                    _ => history_failed(&path, e),
                })?;
                let added = env.history.merge(lines);
                log::debug!("history -r {}: {added} new entries", path.display());
                Ok(BuiltinResult::silent())
            }
            HistoryAction::Show(arg) => {
                let limit = arg.as_deref().and_then(|arg| arg.parse::<usize>().ok());
                let rendered = env.history.render(limit);
                if rendered.is_empty() {
                    Ok(BuiltinResult::silent())
                } else {
                    Ok(BuiltinResult::output(rendered))
                }
            }
        }
    }
}
