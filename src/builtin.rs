use crate::command::{ChildBuiltin, ExitCode, ShellBuiltin};
use crate::env::Environment;
use crate::error::os_message;
use crate::history::History;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by builtins. The message carries the builtin's name as context.
#[derive(Debug, Error)]
pub enum BuiltinError {
    #[error("{0}: Too many arguments")]
    TooManyArguments(&'static str),
    #[error("{0}: Missing variable")]
    MissingVariable(&'static str),
    #[error("{0}: Invalid argument")]
    InvalidVariable(&'static str),
    #[error("cd: HOME not set")]
    HomeNotSet,
    #[error("{path}: {message}")]
    ChangeDir { path: String, message: String },
    #[error("{}", os_message(.0))]
    Io(#[from] io::Error),
}

/// Built-in commands known to the shell at compile time.
///
/// Each builtin validates its own argument count in `from_args` and then runs
/// in-process against the shell-owned state.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "setenv" or "cd".
    fn name() -> &'static str;

    /// Build the command from the arguments following its name.
    fn from_args(args: &[String]) -> Result<Self, BuiltinError>;

    /// Executes the command.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdout: &mut dyn Write,
        env: &mut Environment,
        history: &History,
    ) -> Result<ExitCode, BuiltinError>;
}

fn run<T: BuiltinCommand>(
    args: &[String],
    stdout: &mut dyn Write,
    env: &mut Environment,
    history: &History,
) -> Result<ExitCode, BuiltinError> {
    T::from_args(args)?.execute(stdout, env, history)
}

/// Runs one of the builtins that mutate the shell process itself.
pub(crate) fn run_in_shell(
    builtin: ShellBuiltin,
    args: &[String],
    stdout: &mut dyn Write,
    env: &mut Environment,
    history: &History,
) -> Result<ExitCode, BuiltinError> {
    match builtin {
        ShellBuiltin::Setenv => run::<Setenv>(args, stdout, env, history),
        ShellBuiltin::Unsetenv => run::<Unsetenv>(args, stdout, env, history),
        ShellBuiltin::Cd => run::<Cd>(args, stdout, env, history),
        ShellBuiltin::Exit => run::<Exit>(args, stdout, env, history),
    }
}

/// Runs one of the builtins that execute inside a forked child.
pub(crate) fn run_in_child(
    builtin: ChildBuiltin,
    args: &[String],
    stdout: &mut dyn Write,
    env: &mut Environment,
    history: &History,
) -> Result<ExitCode, BuiltinError> {
    match builtin {
        ChildBuiltin::History => run::<HistoryList>(args, stdout, env, history),
    }
}

/// Checks that `args` has at most `max` entries, and at least one when `needs_variable`.
fn check_arity(
    name: &'static str,
    args: &[String],
    needs_variable: bool,
    max: usize,
) -> Result<(), BuiltinError> {
    if needs_variable && args.is_empty() {
        return Err(BuiltinError::MissingVariable(name));
    }
    if args.len() > max {
        return Err(BuiltinError::TooManyArguments(name));
    }
    Ok(())
}

/// Set a variable, creating or overwriting it. A missing value means the empty string.
pub struct Setenv {
    pub variable: String,
    pub value: Option<String>,
}

impl BuiltinCommand for Setenv {
    fn name() -> &'static str {
        "setenv"
    }

    fn from_args(args: &[String]) -> Result<Self, BuiltinError> {
        check_arity(Self::name(), args, true, 2)?;
        Ok(Setenv {
            variable: args[0].clone(),
            value: args.get(1).cloned(),
        })
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _history: &History,
    ) -> Result<ExitCode, BuiltinError> {
        if self.variable.is_empty() || self.variable.contains('=') {
            return Err(BuiltinError::InvalidVariable(Self::name()));
        }
        env.set_var(self.variable, self.value.unwrap_or_default());
        Ok(0)
    }
}

/// Remove a variable from the environment.
pub struct Unsetenv {
    pub variable: String,
}

impl BuiltinCommand for Unsetenv {
    fn name() -> &'static str {
        "unsetenv"
    }

    fn from_args(args: &[String]) -> Result<Self, BuiltinError> {
        check_arity(Self::name(), args, true, 1)?;
        Ok(Unsetenv {
            variable: args[0].clone(),
        })
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _history: &History,
    ) -> Result<ExitCode, BuiltinError> {
        if self.variable.is_empty() || self.variable.contains('=') {
            return Err(BuiltinError::InvalidVariable(Self::name()));
        }
        env.remove_var(&self.variable);
        Ok(0)
    }
}

/// Change the current working directory.
/// If no target is provided, changes to the directory specified by the HOME variable.
pub struct Cd {
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn from_args(args: &[String]) -> Result<Self, BuiltinError> {
        check_arity(Self::name(), args, false, 1)?;
        Ok(Cd {
            target: args.first().cloned(),
        })
    }

    fn execute(
        self,
        _stdout: &mut dyn Write,
        env: &mut Environment,
        _history: &History,
    ) -> Result<ExitCode, BuiltinError> {
        let target = match self.target {
            Some(t) => PathBuf::from(t),
            None => PathBuf::from(env.get_var_os("HOME").ok_or(BuiltinError::HomeNotSet)?),
        };

        env::set_current_dir(&target).map_err(|e| BuiltinError::ChangeDir {
            path: target.display().to_string(),
            message: os_message(&e),
        })?;
        env.current_dir = env::current_dir().unwrap_or(target);
        Ok(0)
    }
}

/// Exit the shell process.
pub struct Exit;

impl BuiltinCommand for Exit {
    fn name() -> &'static str {
        "exit"
    }

    fn from_args(args: &[String]) -> Result<Self, BuiltinError> {
        check_arity(Self::name(), args, false, 0)?;
        Ok(Exit)
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        env: &mut Environment,
        _history: &History,
    ) -> Result<ExitCode, BuiltinError> {
        writeln!(stdout)?;
        stdout.flush()?;
        env.should_exit = true;
        Ok(0)
    }
}

/// Print every history entry as `index<TAB>line`, oldest first.
pub struct HistoryList;

impl BuiltinCommand for HistoryList {
    fn name() -> &'static str {
        "history"
    }

    fn from_args(args: &[String]) -> Result<Self, BuiltinError> {
        check_arity(Self::name(), args, false, 0)?;
        Ok(HistoryList)
    }

    fn execute(
        self,
        stdout: &mut dyn Write,
        _env: &mut Environment,
        history: &History,
    ) -> Result<ExitCode, BuiltinError> {
        for (index, line) in history.iter() {
            writeln!(stdout, "{index}\t{line}")?;
        }
        stdout.flush()?;
        Ok(0)
    }
}
