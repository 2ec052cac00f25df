//! A small line-oriented command interpreter.
//!
//! A line goes through four steps: [`lexer`] turns it into words, [`redirect`]
//! and [`parser`] split off an output redirection and the `|`-separated
//! stages, [`command`] classifies every stage as a builtin or an executable on
//! `PATH`, and [`pipeline`] runs the stages concurrently, wired left to right.
//!
//! The main entry point is [`Interpreter`], which drives one line per call to
//! [`Interpreter::execute_line`] against a [`Console`], or runs an interactive
//! loop on the terminal with [`Interpreter::repl`].

pub mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
mod external;
pub mod history;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod redirect;

#[cfg(test)]
mod test_utils;

pub use config::{Args, Config};
pub use env::Environment;
pub use error::{ShellError, ShellResult};
pub use interpreter::{Flow, Interpreter};
pub use io_adapters::{Console, MemConsole, StdConsole};
