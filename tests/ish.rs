use pretty_assertions::assert_eq;
use std::fs;
use std::ffi::OsStr;
use std::io::Write;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Run the shell in `dir` with `input` on standard input and no startup script.
fn run_in(dir: &Path, extra_args: &[&str], input: impl AsRef<[u8]>) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_ish"))
        .args(extra_args)
        .current_dir(dir)
        .env_remove("ISH_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn ish");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(input.as_ref())
        .expect("write input");
    child.wait_with_output().expect("wait for ish")
}

fn run(dir: &Path, input: &str) -> (String, String) {
    let output = run_in(dir, &["--no-rc"], input);
    assert!(output.status.success(), "ish exited with {:?}", output.status);
    (
        String::from_utf8(output.stdout).unwrap(),
        String::from_utf8(output.stderr).unwrap(),
    )
}

#[test]
fn output_and_input_redirection() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr) = run(dir.path(), "echo hello > out.txt\ncat < out.txt\n");

    assert_eq!(stderr, "");
    assert!(stdout.contains("hello\n"));
    let out = dir.path().join("out.txt");
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello\n");
    assert_eq!(fs::metadata(&out).unwrap().permissions().mode() & 0o777, 0o600);
}

#[test]
fn output_redirection_truncates() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("out.txt"), "a much longer previous content\n").unwrap();
    run(dir.path(), "echo new>out.txt\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("out.txt")).unwrap(),
        "new\n"
    );
}

#[test]
fn history_is_listed_by_a_redirectable_child() {
    let dir = TempDir::new().unwrap();
    let input = "setenv A 1\n\n   \nno-such-program-xyz\nhistory > h.txt\n";
    run(dir.path(), input);

    assert_eq!(
        fs::read_to_string(dir.path().join("h.txt")).unwrap(),
        "0\tsetenv A 1\n1\tno-such-program-xyz\n2\thistory > h.txt\n"
    );
}

#[test]
fn history_with_arguments_reports_an_error() {
    let dir = TempDir::new().unwrap();
    let (_, stderr) = run(dir.path(), "history -c\n");
    assert!(stderr.contains(": history: Too many arguments"), "{stderr}");
}

#[test]
fn environment_changes_reach_children() {
    let dir = TempDir::new().unwrap();
    let input = concat!(
        "setenv GREETING hi\n",
        "sh -c \"echo [$GREETING]\"\n",
        "unsetenv GREETING\n",
        "sh -c \"echo [$GREETING]\"\n",
    );
    let (stdout, stderr) = run(dir.path(), input);
    assert_eq!(stderr, "");
    assert_eq!(stdout, "% % [hi]\n% % []\n% \n");
}

#[test]
fn non_utf8_variables_reach_children_unchanged() {
    let dir = TempDir::new().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_ish"))
        .arg("--no-rc")
        .current_dir(dir.path())
        .env("RAW", OsStr::from_bytes(b"a\xffb"))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .spawn()
        .expect("spawn ish");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(b"sh -c \"printenv RAW > raw.txt\"\n")
        .expect("write input");
    assert!(child.wait().expect("wait for ish").success());

    assert_eq!(fs::read(dir.path().join("raw.txt")).unwrap(), b"a\xffb\n");
}

#[test]
fn cd_changes_directory_for_later_commands() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let (stdout, stderr) = run(dir.path(), "cd sub\npwd\ncd nowhere\n");

    assert!(stdout.contains("/sub\n"), "{stdout}");
    assert!(
        stderr.contains(": nowhere: No such file or directory"),
        "{stderr}"
    );
}

#[test]
fn launch_failures_are_reported_and_the_shell_continues() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr) = run(dir.path(), "no-such-program-xyz arg\necho after\n");

    assert!(
        stderr.contains(": no-such-program-xyz: No such file or directory"),
        "{stderr}"
    );
    assert!(stdout.contains("after\n"));
}

#[test]
fn missing_input_file_is_reported_by_the_child() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr) = run(dir.path(), "cat < missing.txt\necho after\n");

    assert!(
        stderr.contains(": missing.txt: No such file or directory"),
        "{stderr}"
    );
    assert!(stdout.contains("after\n"));
}

#[test]
fn syntax_and_lexical_errors_are_reported() {
    let dir = TempDir::new().unwrap();
    let (_, stderr) = run(dir.path(), "cat <\n> x\necho \"abc\ncat <a <b\n");

    assert!(stderr.contains(": Standard input redirection without file name\n"));
    assert!(stderr.contains(": Missing command name\n"));
    assert!(stderr.contains(": Unmatched quote\n"));
    assert!(stderr.contains(": Multiple redirection of standard input\n"));
}

#[test]
fn bang_expansion_echoes_and_runs() {
    let dir = TempDir::new().unwrap();
    let (stdout, stderr) = run(dir.path(), "echo one\necho two\n!echo\n!zzz\n");

    assert_eq!(stdout, "% one\n% two\n% echo two\ntwo\n% % \n");
    assert!(stderr.contains(": !zzz: Event not found\n"), "{stderr}");
}

#[test]
fn invalid_utf8_line_is_rejected_and_the_shell_continues() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--no-rc"], b"echo caf\xe9\necho after\n");

    assert!(output.status.success(), "ish exited with {:?}", output.status);
    let stdout = String::from_utf8(output.stdout).unwrap();
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stdout, "% % after\n% \n");
    assert!(stderr.contains(": Invalid character"), "{stderr}");
}

#[test]
fn interrupt_stops_the_child_but_not_the_shell() {
    let dir = TempDir::new().unwrap();
    let (stdout, _) = run(dir.path(), "sh -c \"kill -INT $$; echo survived\"\necho next\n");

    assert!(!stdout.contains("survived"), "{stdout}");
    assert!(stdout.contains("next\n"), "{stdout}");
}

#[test]
fn history_child_succeeds_even_with_arguments() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--no-rc", "--log", "ish=debug"], "history -c\n");

    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("command finished code=0"), "{stderr}");
}

#[test]
fn exit_stops_reading_input() {
    let dir = TempDir::new().unwrap();
    let (stdout, _) = run(dir.path(), "echo before\nexit\necho never\n");

    assert!(stdout.contains("before\n"));
    assert!(!stdout.contains("never"));
}

#[test]
fn startup_file_runs_first_and_is_echoed() {
    let dir = TempDir::new().unwrap();
    let rc = dir.path().join("rc");
    fs::write(&rc, "setenv FROM_RC yes\n").unwrap();

    let output = run_in(
        dir.path(),
        &["--rc", rc.to_str().unwrap()],
        "sh -c \"echo rc=$FROM_RC\"\n",
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("% setenv FROM_RC yes\n"), "{stdout}");
    assert!(stdout.contains("rc=yes\n"), "{stdout}");
}

#[test]
fn missing_startup_file_is_ignored() {
    let dir = TempDir::new().unwrap();
    let output = run_in(dir.path(), &["--rc", "does-not-exist"], "echo ok\n");
    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stderr).unwrap(), "");
}
