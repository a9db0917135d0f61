//! Subprocess execution with a hard deadline.
//!
//! Children run in their own process group so that a timeout kills the whole
//! tree (make spawns compilers, QEMU may fork helpers), not just the leader.

use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;

/// What happened to one external command.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// `None` when killed by a signal (including our own timeout kill).
    pub exit_code: Option<i32>,
    /// Interleaved stdout/stderr, stderr lines prefixed with `[STDERR] `.
    pub output: String,
    pub timed_out: bool,
    pub cancelled: bool,
    pub duration: Duration,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        !self.timed_out && !self.cancelled && self.exit_code == Some(0)
    }
}

/// Longest wait honoured for any single command; larger timeouts are clamped.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// `start + timeout`, clamped to [`MAX_TIMEOUT`] so huge settings cannot overflow `Instant`.
pub fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    let timeout = timeout.min(MAX_TIMEOUT);
    start.checked_add(timeout).unwrap_or(start)
}

/// Run `command` to completion or until `timeout` elapses.
///
/// Spawn failures are returned as `Err`; everything after spawn (non-zero
/// exit, timeout, cancellation) is reported through [`ProcessOutcome`].
pub async fn run_with_timeout(
    command: Command,
    timeout: Duration,
) -> std::io::Result<ProcessOutcome> {
    run_with_deadline(command, deadline_after(Instant::now(), timeout), None).await
}

/// Like [`run_with_timeout`] with an absolute deadline and optional cancel flag.
pub async fn run_with_deadline(
    mut command: Command,
    deadline: Instant,
    mut cancel_rx: Option<watch::Receiver<bool>>,
) -> std::io::Result<ProcessOutcome> {
    let started = Instant::now();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn()?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "Failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "Failed to capture stderr"))?;

    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut stdout_closed = false;
    let mut stderr_closed = false;
    let mut output = String::new();
    let sleep_deadline = tokio::time::Instant::from_std(deadline);

    let mut timed_out = false;
    let mut cancelled = false;

    while !(stdout_closed && stderr_closed) {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_closed => match line {
                Ok(Some(line)) => {
                    output.push_str(&line);
                    output.push('\n');
                }
                _ => stdout_closed = true,
            },
            line = stderr_lines.next_line(), if !stderr_closed => match line {
                Ok(Some(line)) => {
                    output.push_str("[STDERR] ");
                    output.push_str(&line);
                    output.push('\n');
                }
                _ => stderr_closed = true,
            },
            _ = tokio::time::sleep_until(sleep_deadline) => {
                timed_out = true;
                break;
            }
            changed = wait_cancelled(&mut cancel_rx) => {
                if changed {
                    cancelled = true;
                    break;
                }
            }
        }
    }

    let mut exit_code = None;
    if !timed_out && !cancelled {
        match tokio::time::timeout_at(sleep_deadline, child.wait()).await {
            Ok(status) => exit_code = status?.code(),
            Err(_) => timed_out = true,
        }
    }

    if timed_out || cancelled {
        log::warn!(
            "Killing process group after {}",
            if timed_out { "timeout" } else { "cancellation" }
        );
        kill_process_tree(&mut child).await;
    }

    Ok(ProcessOutcome {
        exit_code,
        output,
        timed_out,
        cancelled,
        duration: started.elapsed(),
    })
}

/// Resolves to `true` once the flag is raised; pends forever without a receiver.
async fn wait_cancelled(cancel_rx: &mut Option<watch::Receiver<bool>>) -> bool {
    match cancel_rx {
        Some(rx) => {
            if *rx.borrow() {
                return true;
            }
            match rx.changed().await {
                Ok(()) => *rx.borrow(),
                // Sender gone: nobody can cancel any more.
                Err(_) => std::future::pending().await,
            }
        }
        None => std::future::pending().await,
    }
}

/// SIGKILL the child's process group, then reap the child.
pub async fn kill_process_tree(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;
        if let Err(e) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            log::debug!("killpg({}) failed: {}", pid, e);
        }
    }
    let _ = child.start_kill();
    let _ = child.wait().await;
}
