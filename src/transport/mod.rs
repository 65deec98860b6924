//! The transport boundary: spawning one remote invocation per command.
//!
//! [`Transport`] is the seam between the command runner and the physical
//! channel. The production implementation ([`SshTransport`]) shells out to
//! the `ssh` binary; tests substitute a scripted fake.
//!
//! ```text
//!   runner ──spawn(target, cmd)──► Transport ──► RemoteChild
//!                                                  ├─ stdout lines (mpsc)
//!                                                  ├─ stderr lines (mpsc)
//!                                                  ├─ signals (Term/Kill)
//!                                                  └─ exit (oneshot)
//! ```
//!
//! ## Rules
//! - One remote invocation per `spawn` call; no shell state persists between
//!   calls beyond what the remote side itself retains.
//! - A spawned session must never block on human input (no TTY, no
//!   interactive host-key or password prompts).
//! - The transport owns the OS-level child for the lifetime of one command
//!   only; dropping the [`RemoteChild`] releases it.

mod ssh;

pub use ssh::SshTransport;

use std::io;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::error::ExecError;
use crate::target::Target;

/// Termination signals the runner can send to a remote invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Graceful termination request (SIGTERM on unix).
    Term,
    /// Forceful kill (SIGKILL on unix).
    Kill,
}

/// Handle to one running remote invocation.
///
/// Line-buffered output arrives on the `stdout`/`stderr` receivers; both
/// close at end of stream. The exit code arrives exactly once on `exit`.
/// Signals are fire-and-forget: sending after the process died is a no-op.
pub struct RemoteChild {
    pub(crate) stdout: mpsc::UnboundedReceiver<String>,
    pub(crate) stderr: mpsc::UnboundedReceiver<String>,
    pub(crate) signals: mpsc::UnboundedSender<Signal>,
    pub(crate) exit: oneshot::Receiver<io::Result<Option<i32>>>,
}

impl RemoteChild {
    /// Assembles a handle from raw channels.
    ///
    /// Production transports wire these to a real child process; test
    /// transports drive them directly.
    pub fn from_parts(
        stdout: mpsc::UnboundedReceiver<String>,
        stderr: mpsc::UnboundedReceiver<String>,
        signals: mpsc::UnboundedSender<Signal>,
        exit: oneshot::Receiver<io::Result<Option<i32>>>,
    ) -> Self {
        Self {
            stdout,
            stderr,
            signals,
            exit,
        }
    }
}

/// # Spawns remote invocations for a target.
///
/// Implementations must disable interactive terminal allocation and any
/// prompt that could block on human input.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Starts `command` on `target`, returning a handle to the running
    /// invocation.
    async fn spawn(&self, target: &Target, command: &str) -> Result<RemoteChild, ExecError>;
}
