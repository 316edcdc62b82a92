/// Subprocess transport
///
/// One adapter owns the spawn/capture/timeout mechanics for every external
/// script invocation, so the per-operation code only builds argument lists
/// and interprets outputs.
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, RecvTimeoutError};

use crate::error::BackendError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Captured result of a finished subprocess
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the process exited with status zero
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Best human-readable failure detail: stderr, then stdout, then a stub
    pub fn error_detail(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        "Unknown error".to_string()
    }
}

/// Run a command to completion, capturing stdout and stderr
pub fn run(operation: &'static str, cmd: &mut Command) -> Result<CommandOutput, BackendError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    tracing::debug!("Running {operation}: {program}");

    let output = cmd.output().map_err(|e| BackendError::Spawn {
        program,
        source: e,
    })?;

    let result = CommandOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    tracing::debug!("{operation} exited with {:?}", result.exit_code);
    Ok(result)
}

/// Run a command with a hard deadline, handing each stdout line to
/// `on_line` as it arrives. The child is killed when the deadline passes.
pub fn run_with_deadline(
    operation: &'static str,
    cmd: &mut Command,
    timeout: Duration,
    on_line: &mut dyn FnMut(&str),
) -> Result<CommandOutput, BackendError> {
    let program = cmd.get_program().to_string_lossy().to_string();
    tracing::debug!("Running {operation} with {}s deadline: {program}", timeout.as_secs());

    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| BackendError::Spawn {
            program,
            source: e,
        })?;

    let stdout = child.stdout.take().ok_or_else(|| BackendError::Io {
        operation,
        source: std::io::Error::other("child stdout was not captured"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| BackendError::Io {
        operation,
        source: std::io::Error::other("child stderr was not captured"),
    })?;

    let (line_tx, line_rx) = unbounded::<String>();
    let stdout_reader = thread::spawn(move || {
        let mut collected = String::new();
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            collected.push_str(&line);
            collected.push('\n');
            // Receiver may be gone after a timeout kill
            if line_tx.send(line).is_err() {
                break;
            }
        }
        collected
    });
    let stderr_reader = thread::spawn(move || {
        let mut collected = String::new();
        let _ = BufReader::new(stderr).read_to_string(&mut collected);
        collected
    });

    let deadline = Instant::now() + timeout;
    let mut stdout_open = true;
    let status = loop {
        if stdout_open {
            match line_rx.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    on_line(&line);
                    continue;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => stdout_open = false,
            }
        } else {
            thread::sleep(POLL_INTERVAL);
        }

        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                return Err(BackendError::Io {
                    operation,
                    source: e,
                })
            }
        }

        if Instant::now() >= deadline {
            tracing::warn!("{operation} exceeded its deadline, killing subprocess");
            let _ = child.kill();
            let _ = child.wait();
            return Err(BackendError::TimedOut {
                operation,
                seconds: timeout.as_secs(),
            });
        }
    };

    // Deliver lines that raced with process exit
    while let Ok(line) = line_rx.try_recv() {
        on_line(&line);
    }

    let stdout_text = stdout_reader.join().unwrap_or_default();
    let stderr_text = stderr_reader.join().unwrap_or_default();

    let result = CommandOutput {
        exit_code: status.code(),
        stdout: stdout_text,
        stderr: stderr_text,
    };
    tracing::debug!("{operation} exited with {:?}", result.exit_code);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn test_run_captures_output() {
        let output = run("test echo", &mut shell("echo out; echo err >&2")).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[test]
    fn test_run_nonzero_exit() {
        let output = run("test failure", &mut shell("echo broken >&2; exit 3")).unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.error_detail(), "broken");
    }

    #[test]
    fn test_error_detail_falls_back_to_stdout() {
        let output = CommandOutput {
            exit_code: Some(1),
            stdout: "only stdout\n".to_string(),
            stderr: String::new(),
        };
        assert_eq!(output.error_detail(), "only stdout");

        let silent = CommandOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: String::new(),
        };
        assert_eq!(silent.error_detail(), "Unknown error");
    }

    #[test]
    fn test_run_missing_program() {
        let mut cmd = Command::new("definitely-not-a-real-binary-437");
        let err = run("test spawn", &mut cmd).unwrap_err();
        assert!(matches!(err, BackendError::Spawn { .. }));
    }

    #[test]
    fn test_run_with_deadline_streams_lines() {
        let mut lines = Vec::new();
        let output = run_with_deadline(
            "test stream",
            &mut shell("echo one; echo two"),
            Duration::from_secs(10),
            &mut |line| lines.push(line.to_string()),
        )
        .unwrap();

        assert!(output.success());
        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
        assert!(output.stdout.contains("one"));
        assert!(output.stdout.contains("two"));
    }

    #[test]
    fn test_run_with_deadline_kills_slow_process() {
        let started = Instant::now();
        let err = run_with_deadline(
            "test timeout",
            &mut shell("sleep 30"),
            Duration::from_millis(300),
            &mut |_| {},
        )
        .unwrap_err();

        assert!(matches!(err, BackendError::TimedOut { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
