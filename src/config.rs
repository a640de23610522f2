use crate::env::Environment;
use anyhow::{Context, Result, anyhow};
use argh::FromArgs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Name of the startup script looked up in `$HOME`.
pub const STARTUP_FILE_NAME: &str = ".ishrc";

/// Environment variable holding the default log filter.
pub const LOG_ENV: &str = "ISH_LOG";

#[derive(FromArgs, Debug, Default)]
/// An interactive command interpreter with I/O redirection and `!prefix` history expansion.
pub struct Options {
    #[argh(option)]
    /// startup script to run before reading standard input (default: $HOME/.ishrc)
    pub rc: Option<PathBuf>,

    #[argh(switch)]
    /// do not run any startup script
    pub no_rc: bool,

    #[argh(option)]
    /// log filter such as `debug` or `ish=trace` (default: $ISH_LOG, otherwise off)
    pub log: Option<String>,
}

impl Options {
    /// The startup script to run, if any.
    pub fn startup_file(&self, env: &Environment) -> Option<PathBuf> {
        if self.no_rc {
            return None;
        }
        self.rc.clone().or_else(|| {
            env.get_var_os("HOME")
                .map(|home| Path::new(home).join(STARTUP_FILE_NAME))
        })
    }

    /// The log filter: `--log`, then `$ISH_LOG`, then `off`.
    pub fn log_filter(&self) -> String {
        self.log
            .clone()
            .or_else(|| std::env::var(LOG_ENV).ok())
            .unwrap_or_else(|| "off".to_string())
    }
}

/// Install a `tracing` subscriber that writes to standard error.
pub fn init_logging(filter: &str) -> Result<()> {
    let filter =
        EnvFilter::try_new(filter).with_context(|| format!("invalid log filter {filter:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Options {
        Options::from_args(&["ish"], args).unwrap_or_else(|e| panic!("{}", e.output))
    }

    #[test]
    fn startup_file_defaults_to_home() {
        let mut env = Environment::empty();
        env.set_var("HOME", "/home/someone");
        assert_eq!(
            parse(&[]).startup_file(&env),
            Some(PathBuf::from("/home/someone/.ishrc"))
        );
    }

    #[test]
    fn startup_file_without_home() {
        assert_eq!(parse(&[]).startup_file(&Environment::empty()), None);
    }

    #[test]
    fn explicit_and_disabled_startup_file() {
        let mut env = Environment::empty();
        env.set_var("HOME", "/home/someone");
        assert_eq!(
            parse(&["--rc", "/tmp/rc"]).startup_file(&env),
            Some(PathBuf::from("/tmp/rc"))
        );
        assert_eq!(parse(&["--no-rc"]).startup_file(&env), None);
    }

    #[test]
    fn log_option_wins() {
        assert_eq!(parse(&["--log", "debug"]).log_filter(), "debug");
    }

    #[test]
    fn unknown_option_is_rejected() {
        assert!(Options::from_args(&["ish"], &["--bogus"]).is_err());
    }
}
