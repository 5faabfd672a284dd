use crate::profile::ssh_host_alias;
use crate::ssh;
use std::io::{self, Read};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Upper bound for one connection test
pub const TEST_TIMEOUT: Duration = Duration::from_secs(15);

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// GitHub prints this on stderr after a successful `ssh -T`
const SUCCESS_PHRASE: &str = "successfully authenticated";

/// Result of probing GitHub with a profile's key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    AuthFailure(String),
    Timeout,
    Error(String),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("command timed out after {0:?}")]
    TimedOut(Duration),
    #[error("failed to run command: {0}")]
    Io(#[from] io::Error),
}

/// Captured output of a finished child
#[derive(Debug)]
pub struct Captured {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Run a command to completion, killing it once `timeout` has elapsed
pub fn run_with_timeout(mut command: Command, timeout: Duration) -> Result<Captured, RunError> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // Drain both pipes on helper threads; a full pipe would stall the child
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RunError::TimedOut(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let collect = |handle: Option<thread::JoinHandle<String>>| {
        handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default()
    };

    Ok(Captured {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

/// Classify the diagnostic output of `ssh -T git@github.com`.
///
/// GitHub closes the session with a nonzero exit status even on success,
/// so only the message counts.
pub fn classify(stderr: &str) -> Outcome {
    if stderr.to_lowercase().contains(SUCCESS_PHRASE) {
        Outcome::Success
    } else {
        Outcome::AuthFailure(stderr.trim().to_string())
    }
}

/// Build the probe command for a profile's host alias and key
pub fn probe_command(profile_name: &str, key_path: &Path) -> Command {
    let key = key_path.display().to_string().replace('\\', "/");

    let mut command = Command::new("ssh");
    command
        .arg("-T")
        .arg("-i")
        .arg(&key)
        .args(["-o", "IdentitiesOnly=yes", "-o", "StrictHostKeyChecking=no"])
        .arg(format!("git@{}", ssh_host_alias(profile_name)))
        .env(
            "GIT_SSH_COMMAND",
            format!("ssh -i \"{}\" -o StrictHostKeyChecking=no", key),
        );
    command
}

/// Test GitHub authentication for a profile.
///
/// Seeds known_hosts first, then runs the probe bounded by `TEST_TIMEOUT`.
pub fn test(known_hosts: &Path, profile_name: &str, key_path: &Path) -> Outcome {
    ssh::ensure_known_host(known_hosts);
    test_with(probe_command(profile_name, key_path), TEST_TIMEOUT)
}

fn test_with(command: Command, timeout: Duration) -> Outcome {
    match run_with_timeout(command, timeout) {
        Ok(captured) => classify(&captured.stderr),
        Err(RunError::TimedOut(_)) => Outcome::Timeout,
        Err(RunError::Io(e)) => Outcome::Error(e.to_string()),
    }
}
