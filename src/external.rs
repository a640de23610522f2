use crate::command::{Command, ExitCode};
use crate::env::Environment;
use crate::error::os_message;
use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, dup2, execve, fork};
use std::borrow::Cow;
use std::ffi::{CString, OsStr};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Search path used when the environment has no `PATH`.
const DEFAULT_PATH: &str = "/usr/bin:/bin";

/// Permission bits for files created by output redirection.
const REDIRECT_MODE: u32 = 0o600;

/// A program invocation converted into what `execve` needs.
///
/// Built in the parent so the child does as little as possible between `fork`
/// and `execve`.
pub struct ExternalCommand {
    name: String,
    path: Option<CString>,
    argv: Vec<CString>,
    envp: Vec<CString>,
}

impl ExternalCommand {
    /// Resolve `argv[0]` against the environment's `PATH` and convert the arguments
    /// and variables. A program that cannot be found is not an error here: the child
    /// reports it when it tries to launch.
    pub fn prepare(argv: &[String], env: &Environment) -> Result<Self> {
        let name = argv[0].clone();
        let search_paths = env
            .get_var_os("PATH")
            .unwrap_or(OsStr::new(DEFAULT_PATH));
        let path = find_command_path(search_paths, Path::new(&name))
            .map(|p| CString::new(p.as_os_str().as_bytes()))
            .transpose()
            .with_context(|| format!("{name}: invalid program path"))?;

        let argv = argv
            .iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<Vec<_>, _>>()
            .context("argument contains a NUL byte")?;
        let envp = env
            .vars
            .iter()
            .map(|(k, v)| CString::new([k.as_bytes(), &b"="[..], v.as_bytes()].concat()))
            .collect::<Result<Vec<_>, _>>()
            .context("environment variable contains a NUL byte")?;

        debug!(name = %name, path = ?path, "prepared external command");
        Ok(Self {
            name,
            path,
            argv,
            envp,
        })
    }

    /// Replace the current process image with the program.
    ///
    /// Returns only when the launch failed, after reporting why.
    pub fn exec(&self, prog_name: &str) -> ExitCode {
        let errno = match &self.path {
            Some(path) => match execve(path, &self.argv, &self.envp) {
                Ok(never) => match never {},
                Err(errno) => errno,
            },
            None => Errno::ENOENT,
        };
        eprintln!("{prog_name}: {}: {}", self.name, errno.desc());
        1
    }
}

/// Make the shell process immune to SIGINT so an interrupt never ends the session.
pub fn ignore_interrupts() -> Result<()> {
    // SAFETY: SIG_IGN installs no handler code.
    unsafe { signal::signal(Signal::SIGINT, SigHandler::SigIgn) }
        .context("ignoring SIGINT")?;
    Ok(())
}

/// Fork, run `body` in the child with the command's redirections applied, and wait
/// for that child.
///
/// The child restores the default SIGINT disposition first, so an interrupt stops
/// the running command and never the shell. If a redirection cannot be opened the
/// child reports the path and exits with status 1 without calling `body`.
pub fn run_in_child<F>(command: &Command, prog_name: &str, body: F) -> Result<ExitCode>
where
    F: FnOnce() -> ExitCode,
{
    // Anything still buffered would otherwise be written twice, once by each process.
    io::stdout().flush().context("flushing standard output")?;
    io::stderr().flush().context("flushing standard error")?;

    // SAFETY: the shell is single-threaded, so the child is a complete copy of it.
    match unsafe { fork() }.context("fork")? {
        ForkResult::Child => {
            let code = child_main(command, prog_name, body);
            std::process::exit(code)
        }
        ForkResult::Parent { child } => {
            debug!(%child, command = command.name(), "forked child");
            let status = loop {
                match waitpid(child, None) {
                    Err(Errno::EINTR) => continue,
                    other => break other,
                }
            }
            .context("waitpid")?;
            debug!(?status, "child finished");
            Ok(exit_code(status))
        }
    }
}

fn child_main<F>(command: &Command, prog_name: &str, body: F) -> ExitCode
where
    F: FnOnce() -> ExitCode,
{
    // SAFETY: SIG_DFL installs no handler code.
    if let Err(errno) = unsafe { signal::signal(Signal::SIGINT, SigHandler::SigDfl) } {
        eprintln!("{prog_name}: {}", errno.desc());
        return 1;
    }

    if let Some(path) = &command.stdin {
        if let Err(e) = redirect(path, libc::STDIN_FILENO, OpenOptions::new().read(true)) {
            eprintln!("{prog_name}: {path}: {}", os_message(&e));
            return 1;
        }
    }
    if let Some(path) = &command.stdout {
        let mut options = OpenOptions::new();
        options
            .write(true)
            .create(true)
            .truncate(true)
            .mode(REDIRECT_MODE);
        if let Err(e) = redirect(path, libc::STDOUT_FILENO, &options) {
            eprintln!("{prog_name}: {path}: {}", os_message(&e));
            return 1;
        }
    }

    body()
}

/// Open `path` and make it descriptor `target`. The opened descriptor is closed
/// when the file is dropped.
fn redirect(path: &str, target: RawFd, options: &OpenOptions) -> io::Result<()> {
    let file = options.open(path)?;
    dup2(file.as_raw_fd(), target)?;
    Ok(())
}

fn exit_code(status: WaitStatus) -> ExitCode {
    match status {
        WaitStatus::Exited(_, code) => code,
        WaitStatus::Signaled(_, sig, _) => 128 + sig as i32,
        _ => -1,
    }
}

/// Resolve a command path the way `execvp` would.
///
/// Behavior:
/// - Absolute path: returns it if it exists.
/// - Relative with multiple components (e.g., `bin/sh`, `./foo`): returns it if it exists.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   and return the first executable regular file found, skipping ones without an execute bit.
/// - Empty path: returns `None`.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    if path.is_absolute() {
        return find_by_path(path).map(Cow::Borrowed);
    }

    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        // Empty path -> not found
        (None, None) => None,
        (Some(x), None) if !path.as_os_str().as_bytes().ends_with(b"/") => {
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => find_by_path(path).map(Cow::Borrowed),
    }
}

/// The first executable regular file named `cmd` in `search_paths`. When none is
/// executable, the first regular file, so that launching it reports the denial.
fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    let mut denied = None;
    for path in std::env::split_paths(search_paths).map(|dir| dir.join(cmd)) {
        let Ok(meta) = path.metadata() else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        if meta.permissions().mode() & 0o111 != 0 {
            return Some(path);
        }
        denied.get_or_insert(path);
    }
    denied
}

fn find_by_path(path: &Path) -> Option<&Path> {
    if path.exists() { Some(path) } else { None }
}
