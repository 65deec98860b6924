//! Production transport: one `ssh` child process per command.
//!
//! Sessions are spawned with `BatchMode=yes` (no password prompts), no TTY
//! (`-T`), and `StrictHostKeyChecking=accept-new` so a first connection can
//! never block on an interactive host-key confirmation.
//!
//! A driver task owns the child: it forwards [`Signal::Term`] as SIGTERM to
//! the ssh process, [`Signal::Kill`] as a hard kill, and reports the exit
//! code exactly once.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

use crate::error::ExecError;
use crate::target::Target;
use crate::transport::{RemoteChild, Signal, Transport};

/// Seconds ssh itself waits for the TCP connection.
const CONNECT_TIMEOUT_SECS: u32 = 10;

/// Spawns remote invocations through the system `ssh` binary.
#[derive(Clone, Copy, Debug, Default)]
pub struct SshTransport;

impl SshTransport {
    /// Creates the transport.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn spawn(&self, target: &Target, command: &str) -> Result<RemoteChild, ExecError> {
        let mut cmd = Command::new("ssh");
        cmd.arg("-i")
            .arg(target.key_path())
            .arg("-T")
            .args(["-o", "BatchMode=yes"])
            .args(["-o", "StrictHostKeyChecking=accept-new"])
            .args(["-o", &format!("ConnectTimeout={CONNECT_TIMEOUT_SECS}")])
            .arg(target.key())
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| ExecError::Transport {
            error: format!("spawn ssh: {e}"),
        })?;
        let pid = child.id();

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        if let Some(stdout) = child.stdout.take() {
            pump_lines(stdout, out_tx);
        }
        if let Some(stderr) = child.stderr.take() {
            pump_lines(stderr, err_tx);
        }

        tokio::spawn(drive(child, pid, sig_rx, exit_tx));

        Ok(RemoteChild::from_parts(out_rx, err_rx, sig_tx, exit_rx))
    }
}

/// Forwards lines from a child pipe into a channel until end of stream.
fn pump_lines(reader: impl AsyncRead + Unpin + Send + 'static, tx: mpsc::UnboundedSender<String>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
}

/// Owns the child until exit: applies signals, reports the exit code.
async fn drive(
    mut child: Child,
    pid: Option<u32>,
    mut signals: mpsc::UnboundedReceiver<Signal>,
    exit: oneshot::Sender<io::Result<Option<i32>>>,
) {
    let mut signals_open = true;
    // Child::wait is cancel-safe, so re-creating the future per iteration
    // does not lose the exit status.
    let status = loop {
        tokio::select! {
            res = child.wait() => break res,
            sig = signals.recv(), if signals_open => match sig {
                Some(Signal::Term) => terminate(pid, &mut child),
                Some(Signal::Kill) => {
                    let _ = child.start_kill();
                }
                None => signals_open = false,
            }
        }
    };
    let _ = exit.send(status.map(|s| s.code()));
}

#[cfg(unix)]
fn terminate(pid: Option<u32>, child: &mut Child) {
    match pid {
        Some(pid) => {
            let _ = unsafe { libc::kill(pid as i32, libc::SIGTERM) };
        }
        // Already reaped; nothing graceful left to do.
        None => {
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(unix))]
fn terminate(_pid: Option<u32>, child: &mut Child) {
    let _ = child.start_kill();
}
