use crate::builtin::Builtin;
use crate::env::Environment;
use crate::error::{ShellError, ShellResult};
use crate::parser::{ParsedLine, Position};
use crate::redirect::Redirection;
use std::path::PathBuf;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// How a stage is executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    /// Runs in-process.
    Internal(Builtin),
    /// Spawned from this resolved executable.
    External(PathBuf),
}

/// One command of a pipeline. `words[0]` is the command name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub words: Vec<String>,
    pub kind: CommandKind,
}

impl Stage {
    pub fn name(&self) -> &str {
        &self.words[0]
    }

    pub fn args(&self) -> &[String] {
        &self.words[1..]
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, CommandKind::Internal(_))
    }
}

/// A fully classified command line, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    /// Never empty.
    pub stages: Vec<Stage>,
    /// Applies to the last stage only.
    pub redirection: Option<Redirection>,
}

impl Pipeline {
    pub fn position(&self, index: usize) -> Position {
        Position::of(index, self.stages.len())
    }
}

/// Builtin names win; anything else must resolve to an executable.
pub fn classify(name: &str, env: &Environment) -> ShellResult<CommandKind> {
    if let Some(builtin) = Builtin::from_name(name) {
        return Ok(CommandKind::Internal(builtin));
    }
    env.resolve_command(name)
        .map(CommandKind::External)
        .ok_or_else(|| ShellError::CommandNotFound(name.to_string()))
}

/// Classifies every stage of `parsed`.
///
/// All external commands are resolved up front, so a line naming an unknown
/// command fails before any process is started.
pub fn plan(parsed: ParsedLine, env: &Environment) -> ShellResult<Pipeline> {
    let stages = parsed
        .stages
        .into_iter()
        .map(|words| {
            let kind = classify(&words[0], env)?;
            log::debug!("stage {:?} classified as {:?}", words, kind);
            Ok(Stage { words, kind })
        })
        .collect::<ShellResult<Vec<_>>>()?;

    Ok(Pipeline {
        stages,
        redirection: parsed.redirection,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn env() -> Environment {
        let mut env = Environment::isolated("/");
        env.set_var("PATH", "/bin");
        env
    }

    #[test]
    fn builtins_are_internal_even_if_on_path() {
        let mut env = env();
        env.set_var("PATH", "/bin:/usr/bin");
        assert_eq!(classify("echo", &env).unwrap(), CommandKind::Internal(Builtin::Echo));
        assert_eq!(classify("pwd", &env).unwrap(), CommandKind::Internal(Builtin::Pwd));
    }

    #[test]
    fn other_names_resolve_through_path() {
        assert_eq!(
            classify("sh", &env()).unwrap(),
            CommandKind::External(PathBuf::from("/bin/sh"))
        );
    }

    #[test]
    fn unknown_names_are_not_found() {
        let err = classify("nonexistent_cmd", &env()).unwrap_err();
        assert_eq!(err.to_string(), "nonexistent_cmd: command not found");
    }

    #[test]
    fn plan_fails_if_any_stage_is_unknown() {
        let parsed = parse_line("echo hi | nonexistent_cmd | sh").unwrap().unwrap();
        assert!(matches!(
            plan(parsed, &env()),
            Err(ShellError::CommandNotFound(name)) if name == "nonexistent_cmd"
        ));
    }

    #[test]
    fn plan_keeps_words_and_redirection() {
        let parsed = parse_line("echo a b | sh > out").unwrap().unwrap();
        let pipeline = plan(parsed, &env()).unwrap();
        assert_eq!(pipeline.stages.len(), 2);
        assert!(pipeline.stages[0].is_internal());
        assert_eq!(pipeline.stages[0].name(), "echo");
        assert_eq!(pipeline.stages[0].args(), ["a", "b"]);
        assert!(!pipeline.stages[1].is_internal());
        assert_eq!(pipeline.position(1), Position::Last);
        assert_eq!(pipeline.redirection.unwrap().target, "out");
    }
}
