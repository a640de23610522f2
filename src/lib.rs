//! A small interactive command interpreter.
//!
//! Each input line is optionally expanded against the session history (`!prefix`),
//! split into tokens by a finite-state lexer, parsed into a [`command::Command`] with
//! at most one input and one output redirection, and executed either as a builtin
//! or as an external program in a forked child.
//!
//! The main entry point is [`Interpreter`], which owns the shell environment and the
//! history log and drives the read-eval-print loop.

pub mod builtin;
pub mod command;
pub mod config;
pub mod env;
pub mod error;
pub mod external;
pub mod history;
mod interpreter;
pub mod lexer;
pub mod parser;

/// Just a convenient re-export of the interpreter.
///
/// See [`Interpreter`] for the high-level API.
pub use interpreter::Interpreter;

/// Serializes tests that change the process working directory.
#[cfg(test)]
pub(crate) fn lock_current_dir() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
