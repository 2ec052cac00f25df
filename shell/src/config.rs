//! Start-up configuration: command-line flags with environment fallbacks.

use argh::FromArgs;

/// Environment variable naming the history file loaded at start-up and
/// appended to on exit.
pub const HISTFILE_VAR: &str = "HISTFILE";
/// Environment variable naming the diagnostic log file.
pub const LOG_FILE_VAR: &str = "SHELL_LOG";
pub const DEFAULT_PROMPT: &str = "$ ";

#[derive(FromArgs, Debug, Default)]
/// An interactive command interpreter with builtins, pipelines and redirection.
pub struct Args {
    #[argh(option)]
    /// history file loaded at start-up and appended to on exit (default: $HISTFILE).
    pub histfile: Option<String>,

    #[argh(option)]
    /// write diagnostic logs to this file (default: $SHELL_LOG).
    pub log_file: Option<String>,

    #[argh(switch, short = 'v')]
    /// include debug messages in the log file.
    pub verbose: bool,

    #[argh(option, short = 'c')]
    /// run a single command line, then exit with its status.
    pub command: Option<String>,

    #[argh(option)]
    /// prompt shown before each line.
    pub prompt: Option<String>,
}

/// Settings after applying fallbacks. Paths are still unexpanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub history_file: Option<String>,
    pub log_file: Option<String>,
    pub verbose: bool,
    pub command: Option<String>,
    pub prompt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            history_file: None,
            log_file: None,
            verbose: false,
            command: None,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

impl Config {
    /// Flags win over the variables read through `var`. Empty values count as
    /// unset.
    pub fn from_args(args: Args, var: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
        Self {
            history_file: non_empty(args.histfile).or_else(|| non_empty(var(HISTFILE_VAR))),
            log_file: non_empty(args.log_file).or_else(|| non_empty(var(LOG_FILE_VAR))),
            verbose: args.verbose,
            command: args.command,
            prompt: args.prompt.unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
        }
    }

    /// Reads fallbacks from the process environment.
    pub fn from_env_args(args: Args) -> Self {
        Self::from_args(args, |key| std::env::var(key).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_args(&["shell_commands"], args).expect("valid args")
    }

    #[test]
    fn defaults_without_flags_or_variables() {
        let config = Config::from_args(parse(&[]), |_| None);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn environment_fills_missing_flags() {
        let config = Config::from_args(parse(&[]), |key| match key {
            HISTFILE_VAR => Some("~/.hist".to_string()),
            LOG_FILE_VAR => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.history_file.as_deref(), Some("~/.hist"));
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn flags_win_over_environment() {
        let args = parse(&[
            "--histfile",
            "/tmp/h",
            "--log-file",
            "/tmp/log",
            "-v",
            "-c",
            "echo hi | cat",
            "--prompt",
            "> ",
        ]);
        let config = Config::from_args(args, |_| Some("/from/env".to_string()));
        assert_eq!(config.history_file.as_deref(), Some("/tmp/h"));
        assert_eq!(config.log_file.as_deref(), Some("/tmp/log"));
        assert!(config.verbose);
        assert_eq!(config.command.as_deref(), Some("echo hi | cat"));
        assert_eq!(config.prompt, "> ");
    }
}
