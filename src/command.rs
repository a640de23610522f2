/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// A fully validated simple command, produced by the parser.
///
/// `argv` is never empty and `argv[0]` is the program name. Redirection paths,
/// when present, are never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub argv: Vec<String>,
    pub stdin: Option<String>,
    pub stdout: Option<String>,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn dispatch(&self) -> Dispatch {
        Dispatch::classify(self.name())
    }
}

/// Builtins that must run inside the shell process because they change state
/// a child could not hand back: variables, working directory, process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellBuiltin {
    Setenv,
    Unsetenv,
    Cd,
    Exit,
}

/// Builtins that run in a forked child so their output follows redirection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildBuiltin {
    History,
}

/// Where and how a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Shell(ShellBuiltin),
    Child(ChildBuiltin),
    External,
}

impl Dispatch {
    /// Classify a program name. Matching is exact and case-sensitive.
    pub fn classify(name: &str) -> Self {
        match name {
            "setenv" => Dispatch::Shell(ShellBuiltin::Setenv),
            "unsetenv" => Dispatch::Shell(ShellBuiltin::Unsetenv),
            "cd" => Dispatch::Shell(ShellBuiltin::Cd),
            "exit" => Dispatch::Shell(ShellBuiltin::Exit),
            "history" => Dispatch::Child(ChildBuiltin::History),
            _ => Dispatch::External,
        }
    }
}
