//! Child process execution with output capture and an optional deadline.

use crate::error::{HarnessError, Result};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// `ETXTBSY` on Linux, macOS and the BSDs.
#[cfg(unix)]
const ETXTBSY: i32 = 26;

/// Spawn attempts made while the kernel reports the payload as busy.
const SPAWN_BUSY_ATTEMPTS: u32 = 5;

/// How often a running child is polled when a deadline is set.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output readers get to finish after a timed-out child is killed.
const DRAIN_GRACE: Duration = Duration::from_secs(1);

/// Size of one pipe read.
const READ_CHUNK: usize = 8192;

/// Raw result of running a payload to completion.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code (None if the process was terminated by a signal).
    pub exit_code: Option<i32>,
    pub duration: Duration,
}

impl ProcessOutput {
    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run the executable at `path` with no arguments and no stdin, capturing
/// stdout and stderr separately.
///
/// A non-zero exit is returned as output, not as an error. Spawn failures
/// and deadline overruns are `ProcessFailed`.
pub(super) fn run_executable(path: &Path, timeout: Option<Duration>) -> Result<ProcessOutput> {
    let start = Instant::now();

    let mut child = spawn(path).map_err(|e| {
        let reason = format!("failed to execute payload '{}': {}", path.display(), e);
        HarnessError::ProcessFailed {
            stderr: reason.clone(),
            reason,
        }
    })?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let (status, timed_out) = wait_with_timeout(&mut child, timeout)?;
    let duration = start.elapsed();

    let grace = timed_out.then_some(DRAIN_GRACE);
    let stdout = collect(stdout, grace);
    let stderr = collect(stderr, grace);

    if timed_out {
        let limit = timeout.unwrap_or_default();
        let reason = format!("payload timed out after {}s and was killed", limit.as_secs());
        let captured = String::from_utf8_lossy(&stderr).to_string();
        return Err(HarnessError::ProcessFailed {
            stderr: if captured.is_empty() { reason.clone() } else { captured },
            reason,
        });
    }

    Ok(ProcessOutput {
        stdout,
        stderr,
        exit_code: status.and_then(|s| s.code()),
        duration,
    })
}

fn spawn(path: &Path) -> std::io::Result<Child> {
    let mut attempt = 1;
    loop {
        let mut command = Command::new(path);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // The payload leads its own process group so a deadline kill reaches
        // everything it forked.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let result = command.spawn();

        match result {
            // Another thread forking while our write handle was still open
            // keeps the file busy for a moment.
            Err(e) if is_text_file_busy(&e) && attempt < SPAWN_BUSY_ATTEMPTS => {
                tracing::debug!(path = %path.display(), attempt, "payload busy, retrying spawn");
                thread::sleep(Duration::from_millis(10 * u64::from(attempt)));
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(unix)]
fn is_text_file_busy(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(ETXTBSY)
}

#[cfg(not(unix))]
fn is_text_file_busy(_e: &std::io::Error) -> bool {
    false
}

/// Read a pipe on its own thread so neither pipe can fill up and stall the
/// child. Output is forwarded in chunks as it arrives.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let Some(mut pipe) = pipe else {
            return;
        };
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match pipe.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    if tx.send(chunk[..n].to_vec()).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
    });
    rx
}

/// Gather everything a reader forwarded.
///
/// With a grace period, collection stops at the grace deadline even if the
/// pipe is still open; whatever arrived before then is kept.
fn collect(rx: Receiver<Vec<u8>>, grace: Option<Duration>) -> Vec<u8> {
    let deadline = grace.map(|grace| Instant::now() + grace);
    let mut buf = Vec::new();
    loop {
        let chunk = match deadline {
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(chunk) => chunk,
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::debug!("payload output still open after grace period");
                        break;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(chunk) => chunk,
                Err(_) => break,
            },
        };
        buf.extend_from_slice(&chunk);
    }
    buf
}

/// Wait for a child process, killing it once `timeout` elapses.
///
/// Returns (exit status, timed_out).
fn wait_with_timeout(
    child: &mut Child,
    timeout: Option<Duration>,
) -> Result<(Option<ExitStatus>, bool)> {
    let Some(timeout) = timeout else {
        let status = child.wait().map_err(wait_error)?;
        return Ok((Some(status), false));
    };

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok((Some(status), false)),
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process(child);
                    return Ok((None, true));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                kill_process(child);
                return Err(wait_error(e));
            }
        }
    }
}

/// Kill a payload and its process group, then reap it.
fn kill_process(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, killpg};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            tracing::debug!(pid = child.id(), error = %e, "process group kill failed");
        }
    }

    // On Unix this is SIGKILL; on Windows it is TerminateProcess.
    let _ = child.kill();
    let _ = child.wait();
}

fn wait_error(e: std::io::Error) -> HarnessError {
    let reason = format!("failed to wait for payload: {}", e);
    HarnessError::ProcessFailed {
        stderr: reason.clone(),
        reason,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::process::CommandExt;

    #[test]
    fn test_kill_process_reaps_child_and_its_group() {
        let markers = tempfile::TempDir::new().unwrap();
        let marker = markers.path().join("survived");
        let mut child = Command::new("/bin/sh")
            .arg("-c")
            .arg(format!("(sleep 1; touch '{}') & sleep 30", marker.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .unwrap();
        thread::sleep(Duration::from_millis(100));

        kill_process(&mut child);

        assert!(child.try_wait().unwrap().is_some());
        thread::sleep(Duration::from_secs(2));
        assert!(!marker.exists());
    }

    #[test]
    fn test_collect_keeps_partial_output_after_grace() {
        let (tx, rx) = mpsc::channel();
        tx.send(b"partial ".to_vec()).unwrap();
        tx.send(b"stderr".to_vec()).unwrap();

        // Sender still open, as when a pipe is held by a stray process.
        let collected = collect(rx, Some(Duration::from_millis(50)));
        assert_eq!(collected, b"partial stderr");
        drop(tx);
    }
}
