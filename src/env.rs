use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::{OsStr, OsString};
use std::path::PathBuf;

/// Shell-owned view of the process environment.
///
/// The environment contains:
/// - `vars`: the variables handed to every child as its complete environment, byte for byte.
/// - `current_dir`: the working directory, kept in sync with the process by `cd`.
/// - `should_exit`: set by the `exit` builtin; the read loop stops when it is true.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<OsString, OsString>,
    pub current_dir: PathBuf,
    pub should_exit: bool,
}

impl Environment {
    /// Capture the current process state into a new `Environment` instance.
    pub fn new() -> Self {
        let vars = stdenv::vars_os().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            vars,
            current_dir,
            should_exit: false,
        }
    }

    /// An environment with no variables, rooted at the process working directory.
    pub fn empty() -> Self {
        Self {
            vars: HashMap::new(),
            ..Self::new()
        }
    }

    /// The value of `key`, if it is set and valid UTF-8.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.get_var_os(key).and_then(OsStr::to_str)
    }

    pub fn get_var_os(&self, key: &str) -> Option<&OsStr> {
        self.vars.get(OsStr::new(key)).map(OsString::as_os_str)
    }

    /// Set or override a variable.
    pub fn set_var(&mut self, key: impl Into<OsString>, val: impl Into<OsString>) {
        self.vars.insert(key.into(), val.into());
    }

    pub fn remove_var(&mut self, key: &str) {
        self.vars.remove(OsStr::new(key));
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::env::Environment;
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    #[test]
    fn test_env_set_get_remove() {
        let mut env = Environment::empty();

        // initially absent
        assert_eq!(env.get_var("SOME_RANDOM_ENV_VAR_12345"), None);

        env.set_var("KEY", "VALUE");
        assert_eq!(env.get_var("KEY"), Some("VALUE"));

        env.set_var("KEY", "OTHER");
        assert_eq!(env.get_var("KEY"), Some("OTHER"));

        env.remove_var("KEY");
        assert_eq!(env.get_var("KEY"), None);
    }

    #[test]
    fn test_env_reads_from_process_env() {
        let env = Environment::new();
        assert!(env.get_var("PATH").is_some());
        assert!(!env.should_exit);
    }

    #[test]
    fn test_env_keeps_non_utf8_values() {
        let mut env = Environment::empty();
        let raw = OsStr::from_bytes(b"a\xffb");
        env.set_var("RAW", raw);

        assert_eq!(env.get_var_os("RAW"), Some(raw));
        assert_eq!(env.get_var("RAW"), None);
    }
}
