use std::{
    fs,
    io::{BufRead, BufReader, Write},
    path::Path,
    process::{Child, Command, Output, Stdio},
    time::{Duration, Instant},
};

use pretty_assertions::assert_eq;

fn spawn(dir: &Path, script: &str) -> Child {
    let mut child = Command::new(env!("CARGO_BIN_EXE_xsh"))
        .current_dir(dir)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    stdin.write_all(script.as_bytes()).unwrap();
    child
}

fn run(script: &str) -> (tempfile::TempDir, Output) {
    let dir = tempfile::tempdir().unwrap();
    let output = spawn(dir.path(), script).wait_with_output().unwrap();
    assert!(output.status.success(), "{output:?}");
    (dir, output)
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn runs_a_program() {
    let (_, output) = run("echo hello world\n");
    assert_eq!(stdout(&output), "hello world\n");
}

#[test]
fn pipes_connect_programs() {
    let (_, output) = run("echo hello | tr a-z A-Z\n");
    assert_eq!(stdout(&output), "HELLO\n");
}

#[test]
fn sequence_ignores_the_exit_status() {
    let (_, output) = run("false ; echo hi\n");
    assert_eq!(stdout(&output), "hi\n");
}

#[test]
fn redirections() {
    let (dir, output) = run("echo one > out\necho two >> out\ntr a-z A-Z < out\n");

    assert_eq!(stdout(&output), "ONE\nTWO\n");
    assert_eq!(
        fs::read_to_string(dir.path().join("out")).unwrap(),
        "one\ntwo\n"
    );
}

#[test]
fn truncating_redirection_replaces_the_file() {
    let (dir, _) = run("echo first line > out\necho x > out\n");

    assert_eq!(fs::read_to_string(dir.path().join("out")).unwrap(), "x\n");
}

#[test]
fn missing_program_does_not_stop_the_interpreter() {
    let (_, output) = run("no-such-program-here\necho after\n");

    assert!(stderr(&output).contains("exec no-such-program-here failed"));
    assert_eq!(stdout(&output), "after\n");
}

#[test]
fn missing_input_file_is_reported() {
    let (_, output) = run("cat < missing\necho after\n");

    assert!(stderr(&output).contains("open missing failed"));
    assert_eq!(stdout(&output), "after\n");
}

#[test]
fn parse_errors_are_reported() {
    let (_, output) = run("echo 1 2 3 4 5 6 7 8 9 10\necho >\necho ok\n");

    let err = stderr(&output);
    assert!(err.contains("syntax error: too many args"), "{err}");
    assert!(err.contains("syntax error: missing file for redirection"), "{err}");
    assert_eq!(stdout(&output), "ok\n");
}

#[test]
fn cd_changes_the_interpreter_directory() {
    let (_, output) = run("cd /\npwd\n");
    assert_eq!(stdout(&output), "/\n");
}

#[test]
fn failed_cd_is_reported() {
    let (dir, output) = run("cd /no/such/dir\npwd\n");

    assert!(stderr(&output).contains("cannot cd /no/such/dir"));
    let cwd = fs::canonicalize(dir.path()).unwrap();
    assert_eq!(stdout(&output).trim_end(), cwd.to_string_lossy());
}

#[test]
fn blocks_share_one_output() {
    let (_, output) = run("(echo a ; echo b) | wc -l\n");
    assert_eq!(stdout(&output).trim(), "2");
}

#[test]
fn last_line_without_newline_still_runs() {
    let (_, output) = run("echo a\necho b");
    assert_eq!(stdout(&output), "a\nb\n");
}

#[test]
fn blank_lines_are_skipped() {
    let (_, output) = run("\n   \necho a\n\n");
    assert_eq!(stdout(&output), "a\n");
}

#[test]
fn background_jobs_are_not_waited_for() {
    let dir = tempfile::tempdir().unwrap();
    let start = Instant::now();

    let mut child = spawn(dir.path(), "sleep 3 &\necho done\n");
    let status = child.wait().unwrap();
    assert!(status.success());
    assert!(start.elapsed() < Duration::from_secs(2));

    // the sleep still holds the pipe, so only read what is already there
    let mut line = String::new();
    BufReader::new(child.stdout.take().unwrap())
        .read_line(&mut line)
        .unwrap();
    assert_eq!(line, "done\n");
}
