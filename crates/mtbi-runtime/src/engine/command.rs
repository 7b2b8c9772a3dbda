//! External process invocation.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use super::EngineConfig;
use super::failure::FailureReason;

/// Captured result of a finished command.
///
/// Output read before a timeout is kept.
pub(super) struct Finished {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: Option<Duration>,
}

impl Finished {
    /// Returns why the command counts as failed, if it does.
    pub fn failure_reason(&self) -> Option<FailureReason> {
        if let Some(timeout) = self.timed_out {
            return Some(FailureReason::timed_out(timeout));
        }
        match self.exit_code {
            Some(0) => None,
            Some(code) => Some(FailureReason::ExitStatus { code }),
            None => Some(FailureReason::Terminated),
        }
    }
}

/// Runs `command` through the configured shell inside `workdir`.
///
/// The child is killed when the timeout elapses. Both output streams are
/// captured in full; output read before a timeout is kept.
pub(super) async fn run(
    config: &EngineConfig,
    workdir: &Path,
    command: &str,
) -> Result<Finished, FailureReason> {
    let mut process = Command::new(&config.shell);
    process
        .args(&config.shell_args)
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let spawn_error = |err: std::io::Error| FailureReason::Spawn {
        message: err.to_string(),
    };
    let mut child = process.spawn().map_err(spawn_error)?;
    let (Some(stdout_pipe), Some(stderr_pipe)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(FailureReason::Spawn {
            message: "output pipes are unavailable".to_owned(),
        });
    };

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let collect = async {
        let (status, out, err) = tokio::join!(
            child.wait(),
            drain(stdout_pipe, &mut stdout),
            drain(stderr_pipe, &mut stderr),
        );
        out.and(err).and(status)
    };

    let status: Option<std::io::Result<ExitStatus>> = match config.rule_timeout {
        Some(timeout) => tokio::time::timeout(timeout, collect).await.ok(),
        None => Some(collect.await),
    };

    match status {
        Some(status) => Ok(Finished {
            exit_code: status.map_err(spawn_error)?.code(),
            stdout,
            stderr,
            timed_out: None,
        }),
        None => {
            // The child may already be gone; the timeout is reported either way.
            let _ = child.kill().await;
            Ok(Finished {
                exit_code: None,
                stdout,
                stderr,
                timed_out: config.rule_timeout,
            })
        }
    }
}

/// Appends everything `reader` yields to `sink`, chunk by chunk.
async fn drain(mut reader: impl AsyncRead + Unpin, sink: &mut Vec<u8>) -> std::io::Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        sink.extend_from_slice(&chunk[..read]);
    }
}

/// Returns at most the last `limit` bytes of `bytes` as trimmed text.
pub(super) fn tail(bytes: &[u8], limit: usize) -> String {
    let start = bytes.len().saturating_sub(limit);
    String::from_utf8_lossy(&bytes[start..]).trim().to_owned()
}
