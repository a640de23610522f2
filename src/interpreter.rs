use crate::builtin;
use crate::command::{ChildBuiltin, Command, Dispatch, ExitCode};
use crate::env::Environment;
use crate::external::{self, ExternalCommand};
use crate::history::{self, History};
use crate::lexer;
use crate::parser;
use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufRead, BufReader, IsTerminal, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

const PROMPT: &str = "% ";

/// The interpret loop: owns the shell environment and the session history.
///
/// Each input line goes through history expansion, lexing, recording, parsing and
/// execution. Errors in any stage are reported on standard error and never end
/// the session; only `exit` or end of input do.
///
/// Example
/// ```no_run
/// use ish::Interpreter;
/// let mut sh = Interpreter::new("ish");
/// sh.perform_line("setenv GREETING hello").unwrap();
/// assert_eq!(sh.env().get_var("GREETING"), Some("hello"));
/// ```
pub struct Interpreter {
    env: Environment,
    history: History,
    prog_name: String,
}

impl Interpreter {
    /// Create an interpreter over the current process environment.
    ///
    /// `prog_name` prefixes every error message.
    pub fn new(prog_name: impl Into<String>) -> Self {
        Self::with_environment(prog_name, Environment::new())
    }

    pub fn with_environment(prog_name: impl Into<String>, env: Environment) -> Self {
        Self {
            env,
            history: History::new(),
            prog_name: prog_name.into(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// True once the `exit` builtin has run.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Process one line, writing the shell's own output to standard output.
    pub fn perform_line(&mut self, line: &str) -> Result<()> {
        self.perform_line_with_output(line, &mut io::stdout())
    }

    /// Process one line. `out` receives what the shell itself prints (the expanded
    /// line, the newline of `exit`); children always write to the real standard output.
    ///
    /// Returns an error only when process plumbing (fork, wait) fails.
    pub fn perform_line_with_output(&mut self, line: &str, out: &mut dyn Write) -> Result<()> {
        let line = if history::contains_reference(line) {
            match history::expand(line, &self.history) {
                Ok(expanded) => {
                    writeln!(out, "{expanded}")?;
                    expanded
                }
                Err(err) => {
                    self.report(err);
                    return Ok(());
                }
            }
        } else {
            line.to_string()
        };

        let lexed = lexer::split_into_tokens(&line);
        trace!(tokens = ?lexed.tokens, "lexed line");
        if let Err(err) = &lexed.status {
            self.report(err);
        }
        if lexed.tokens.is_empty() {
            return Ok(());
        }
        self.history.push(line);
        if !lexed.is_ok() {
            return Ok(());
        }

        let command = match parser::construct_command(lexed.tokens) {
            Ok(command) => command,
            Err(err) => {
                self.report(err);
                return Ok(());
            }
        };
        debug!(?command, "parsed command");
        let code = self.execute(&command, out)?;
        debug!(code, "command finished");
        Ok(())
    }

    fn execute(&mut self, command: &Command, out: &mut dyn Write) -> Result<ExitCode> {
        let dispatch = command.dispatch();
        debug!(?dispatch, "dispatching");
        match dispatch {
            Dispatch::Shell(which) => {
                let result =
                    builtin::run_in_shell(which, command.args(), out, &mut self.env, &self.history);
                result.or_else(|err| {
                    self.report(err);
                    Ok(1)
                })
            }
            Dispatch::Child(which) => {
                let prog_name = self.prog_name.clone();
                external::run_in_child(command, &prog_name, || {
                    self.child_builtin(which, command.args(), &mut io::stdout().lock())
                })
            }
            Dispatch::External => {
                let program = ExternalCommand::prepare(&command.argv, &self.env)?;
                external::run_in_child(command, &self.prog_name, || program.exec(&self.prog_name))
            }
        }
    }

    /// Body of the child forked for a builtin. The child exits successfully even
    /// when the builtin reports an error.
    fn child_builtin(
        &mut self,
        which: ChildBuiltin,
        args: &[String],
        out: &mut dyn Write,
    ) -> ExitCode {
        if let Err(err) = builtin::run_in_child(which, args, out, &mut self.env, &self.history) {
            self.report(err);
        }
        0
    }

    /// Run a startup script, echoing each line as `% line` before processing it.
    ///
    /// A missing file is skipped silently; any other failure to read it is reported.
    pub fn run_startup_file(&mut self, path: &Path) {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no startup file");
                return;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cannot open startup file");
                self.report(format!("{}: {}", path.display(), crate::error::os_message(&e)));
                return;
            }
        };

        if let Err(e) = self.run_script(BufReader::new(file), &mut io::stdout()) {
            self.report(format!("{}: {e:#}", path.display()));
        }
    }

    /// Process every line of `script` until it ends or `exit` runs.
    pub fn run_script(&mut self, mut script: impl BufRead, out: &mut dyn Write) -> Result<()> {
        let mut buf = Vec::new();
        while let Some(line) = read_line(&mut script, &mut buf).context("reading script")? {
            writeln!(out, "{PROMPT}{line}")?;
            out.flush()?;
            if let Err(e) = self.perform_line_with_output(&line, out) {
                self.report(format!("{e:#}"));
            }
            if self.should_exit() {
                break;
            }
        }
        Ok(())
    }

    /// Read-Eval-Print Loop over standard input.
    ///
    /// A terminal gets a line editor; piped input is read line by line, with the
    /// prompt written before each line. End of input prints a newline.
    pub fn repl(&mut self) -> Result<()> {
        if io::stdin().is_terminal() {
            self.interactive_loop()
        } else {
            self.piped_loop(io::stdin().lock())
        }
    }

    fn interactive_loop(&mut self) -> Result<()> {
        let mut rl = DefaultEditor::new().context("initialising line editor")?;

        while !self.should_exit() {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let recorded = self.history.len();
                    if let Err(e) = self.perform_line(&line) {
                        self.report(format!("{e:#}"));
                    }
                    if self.history.len() > recorded {
                        if let Err(e) = rl.add_history_entry(line.as_str()) {
                            warn!(error = %e, "cannot add line to editor history");
                        }
                    }
                }
                // Ctrl-C at the prompt drops the line being typed.
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => return Err(err).context("reading input"),
            }
        }

        Ok(())
    }

    fn piped_loop(&mut self, mut input: impl BufRead) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            let mut stdout = io::stdout();
            write!(stdout, "{PROMPT}")?;
            stdout.flush()?;

            let Some(line) = read_line(&mut input, &mut buf).context("reading input")? else {
                break;
            };
            if let Err(e) = self.perform_line(&line) {
                self.report(format!("{e:#}"));
            }
            if self.should_exit() {
                return Ok(());
            }
        }
        println!();
        Ok(())
    }

    fn report(&self, err: impl Display) {
        eprintln!("{}: {}", self.prog_name, err);
    }
}

/// Read one line without its newline. Bytes that are not UTF-8 become U+FFFD,
/// which the lexer rejects, so a bad line never ends the input.
fn read_line(input: &mut impl BufRead, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if input.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    if buf.last() == Some(&b'\n') {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(buf).into_owned()))
}
