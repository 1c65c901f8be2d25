use std::fs;
use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

const SHELL: &str = env!("CARGO_BIN_EXE_fcit-shell");

/// Feeds `script` to the shell on stdin and collects its output.
fn run_script(script: &str) -> Output {
    let mut child = Command::new(SHELL)
        .env_remove("FCIT_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("shell starts");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn run_command(line: &str) -> Output {
    Command::new(SHELL)
        .env_remove("FCIT_LOG")
        .args(["-c", line])
        .output()
        .expect("shell starts")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

macro_rules! output_test {
    ($name:ident, $line:expr, $expected:expr) => {
        #[test]
        fn $name() {
            let output = run_command($line);
            assert_eq!(stdout(&output), $expected, "command: {}", $line);
        }
    };
}

// ── Pipelines ──

output_test!(pipe_two_stages, "echo hi | cat", "hi\n");
output_test!(pipe_three_stages, "printf 'c\\na\\nb\\n' | sort | tr a-z A-Z", "A\nB\nC\n");
output_test!(pipe_attached_operators, "printf 'x\\ny\\n'|wc -l|tr -d ' '", "2\n");
output_test!(quoted_pipe_is_text, "echo 'a | b'", "a | b\n");
output_test!(builtin_echo, "echo   spaced    out", "spaced out\n");

// ── Redirection ──

#[test]
fn output_redirect_leaves_terminal_quiet() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let output = run_command(&format!("printf hello > {}", out.display()));
    assert_eq!(stdout(&output), "");
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello");
}

#[test]
fn append_keeps_earlier_runs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.txt");
    let line = format!("printf 'run\\n' >> {}", out.display());
    run_command(&line);
    run_command(&line);
    assert_eq!(fs::read_to_string(&out).unwrap(), "run\nrun\n");
}

#[test]
fn input_redirect_into_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.txt");
    fs::write(&input, "pear\napple\n").unwrap();
    let output = run_command(&format!("sort < {} | head -n 1", input.display()));
    assert_eq!(stdout(&output), "apple\n");
}

#[test]
fn missing_input_file_is_reported() {
    let output = run_command("cat < /definitely/missing/file");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("/definitely/missing/file"));
}

// ── Errors and statuses ──

#[test]
fn unknown_command_is_127() {
    let output = run_command("no-such-program-for-fcit --flag");
    assert_eq!(output.status.code(), Some(127));
    assert!(stderr(&output).contains("no-such-program-for-fcit: command not found"));
}

#[test]
fn syntax_errors_do_not_stop_the_loop() {
    let output = run_script("ls |\ncat <\necho 'open\necho still here\n");
    assert_eq!(stdout(&output), "still here\n");
    let errors = stderr(&output);
    assert!(errors.contains("empty command"));
    assert!(errors.contains("needs a file name"));
    assert!(errors.contains("unclosed single quote"));
    assert!(output.status.success());
}

#[test]
fn cd_changes_later_commands() {
    let dir = tempfile::tempdir().unwrap();
    let canonical = dir.path().canonicalize().unwrap();
    let output = run_script(&format!("cd {}\npwd\n/bin/pwd\n", canonical.display()));
    let expected = format!("{0}\n{0}\n", canonical.display());
    assert_eq!(stdout(&output), expected);
}

#[test]
fn cd_failure_keeps_running() {
    let output = run_script("cd /definitely/not/here\necho alive\n");
    assert_eq!(stdout(&output), "alive\n");
    assert!(stderr(&output).contains("No such file or directory"));
}

#[test]
fn exit_stops_reading() {
    let output = run_script("echo before\nexit\necho after\n");
    assert_eq!(stdout(&output), "before\nShell exited.\n");
    assert!(output.status.success());
}

#[test]
fn end_of_input_returns_last_status() {
    let output = run_script("true\nfalse\n");
    assert_eq!(output.status.code(), Some(1));
}

// ── History ──

#[test]
fn history_and_recall() {
    let output = run_script("echo a\necho b\nhistory\n!1\n!9\n!x\n");
    assert_eq!(
        stdout(&output),
        "a\nb\n1 echo a\n2 echo b\n3 history\na\n"
    );
    let errors = stderr(&output);
    assert!(errors.contains("No such history entry: 9"));
    assert!(errors.contains("Invalid history reference: !x"));
}

// ── Background jobs ──

#[test]
fn background_job_does_not_block() {
    let started = Instant::now();
    let mut child = Command::new(SHELL)
        .args(["-c", "sleep 3 > /dev/null &"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    child.wait().unwrap();
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[test]
fn background_completion_is_reported() {
    let output = run_script("true &\nsleep 1\necho next\n");
    let out = stdout(&output);
    assert!(out.starts_with("[1] "), "unexpected output: {out}");
    assert!(out.contains("[1] Done (0) true &\n"), "unexpected output: {out}");
    assert!(out.ends_with("next\n"));
}

#[test]
fn closed_stdout_does_not_panic() {
    let mut child = Command::new(SHELL)
        .env_remove("FCIT_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("shell starts");
    // Nobody reads the job notice.
    drop(child.stdout.take());
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"sleep 0 &\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(!stderr(&output).contains("panicked"));
}

// ── Configuration ──

#[test]
fn config_history_size_applies() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "history_size = 2\n").unwrap();
    let mut child = Command::new(SHELL)
        .arg("--config")
        .arg(&config)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"true\nfalse\nhistory\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert_eq!(stdout(&output), "1 false\n2 history\n");
}

#[test]
fn invalid_config_fails_fast() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "history_size = 0\n").unwrap();
    let output = Command::new(SHELL)
        .arg("--config")
        .arg(&config)
        .args(["-c", "true"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(stderr(&output).contains("history_size"));
}
