//! Error types for remote command execution.
//!
//! [`ExecError`] is the single error taxonomy that flows back through the
//! execution stack (runner → pool → executor → lifecycle):
//!
//! - [`ExecError::Transport`] — the remote session could not be created or
//!   broke mid-command.
//! - [`ExecError::CommandFailed`] — the command ran and exited nonzero.
//! - [`ExecError::Timeout`] — the command exceeded its allotted time and was
//!   forcibly terminated.
//! - [`ExecError::PoolClosed`] — the pool was torn down before the command
//!   completed.
//!
//! The runner never retries; retryability (`is_retryable`) is consulted by
//! the policy layer only.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by remote command execution.
///
/// Carries enough context for the policy layer to decide whether to retry
/// and for observers to render a useful diagnostic line.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ExecError {
    /// The remote session could not be spawned, or I/O with it failed.
    #[error("transport failure: {error}")]
    Transport {
        /// Underlying I/O or spawn error message.
        error: String,
    },

    /// The remote command ran to completion but exited nonzero.
    #[error("command exited with code {exit_code}: {stderr}")]
    CommandFailed {
        /// Exit code reported by the remote shell.
        exit_code: i32,
        /// Normalized standard-error text.
        stderr: String,
    },

    /// The command exceeded its timeout and was terminated.
    #[error("timed out after {elapsed:?}: {command}")]
    Timeout {
        /// Wall-clock time spent before the command was given up on.
        elapsed: Duration,
        /// The command text, for diagnostics.
        command: String,
    },

    /// The connection pool was shut down while this command was pending.
    #[error("connection pool closed before the command completed")]
    PoolClosed,
}

impl ExecError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use nodevisor::ExecError;
    ///
    /// let err = ExecError::PoolClosed;
    /// assert_eq!(err.as_label(), "exec_pool_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ExecError::Transport { .. } => "exec_transport",
            ExecError::CommandFailed { .. } => "exec_command_failed",
            ExecError::Timeout { .. } => "exec_timeout",
            ExecError::PoolClosed => "exec_pool_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ExecError::Transport { error } => format!("transport: {error}"),
            ExecError::CommandFailed { exit_code, stderr } => {
                format!("exit={exit_code}: {stderr}")
            }
            ExecError::Timeout { elapsed, command } => {
                format!("timeout after {elapsed:?}: {command}")
            }
            ExecError::PoolClosed => "pool closed".to_string(),
        }
    }

    /// Indicates whether the error type is safe to retry.
    ///
    /// Returns `true` for [`ExecError::CommandFailed`] and
    /// [`ExecError::Timeout`]. A closed pool will not recover by retrying,
    /// and a transport failure means the channel itself is broken, not the
    /// command. The policy layer consults this; the runner never retries.
    ///
    /// # Example
    /// ```
    /// use nodevisor::ExecError;
    ///
    /// let retryable = ExecError::CommandFailed { exit_code: 1, stderr: "boom".into() };
    /// assert!(retryable.is_retryable());
    ///
    /// assert!(!ExecError::PoolClosed.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecError::CommandFailed { .. } | ExecError::Timeout { .. }
        )
    }
}
