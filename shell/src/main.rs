use anyhow::{Context, Result};
use shell_commands::{Args, Config, Flow, Interpreter, StdConsole};
use simplelog::{LevelFilter, WriteLogger};
use std::fs::File;

fn init_logging(config: &Config) -> Result<()> {
    let Some(raw) = &config.log_file else {
        return Ok(());
    };
    let path = shellexpand::tilde(raw);
    let file = File::options()
        .create(true)
        .append(true)
        .open(path.as_ref())
        .with_context(|| format!("failed to open log file {path}"))?;
    let level = if config.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    WriteLogger::init(level, simplelog::Config::default(), file)
        .context("failed to initialise logger")?;
    Ok(())
}

fn main() -> Result<()> {
    let args: Args = argh::from_env();
    let config = Config::from_env_args(args);
    init_logging(&config)?;

    let mut shell = Interpreter::from_config(&config);
    let code = match &config.command {
        Some(line) => {
            let flow = shell.execute_line(line, &mut StdConsole::new());
            shell.shutdown();
            match flow {
                Flow::Continue(code) => code,
                Flow::Exit => 0,
            }
        }
        None => {
            shell.repl(&config.prompt).context("line editor failed")?;
            0
        }
    };
    std::process::exit(code);
}
