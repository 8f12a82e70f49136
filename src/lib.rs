//! A small interactive shell with diagnostic builtins.
//!
//! Every line typed at the prompt is recorded in the session history and then
//! routed to exactly one handler: session exit, history listing, `echo`,
//! environment lookup (`\e`), boot signature detection (`\l`), cron spool
//! snapshot (`\cron`), process memory dump (`\mem`), or, failing all of those,
//! an external program run with the shell's terminal.
//!
//! This is not a POSIX shell: there is no piping, redirection, quoting,
//! globbing or scripting.
//!
//! The main entry point is [`Interpreter`]. The [`boot`] module exposes the
//! boot signature detector on its own.

pub mod boot;
mod builtin;
pub mod command;
pub mod config;
pub mod env;
mod external;
pub mod history;
pub mod io_adapters;
mod interpreter;
pub mod signal;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use env::Environment;
/// Just a convenient re-export of the interactive command runner.
///
/// See [`Interpreter`] for the high-level API and examples.
pub use interpreter::{Flow, Interpreter, Session, State};
