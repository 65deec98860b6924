//! # Sudo-aware retry executor.
//!
//! [`Executor`] wraps the [`ConnectionPool`] with the per-command policy
//! layer: privileged commands are rewritten to their non-interactive form
//! and retried on a slower schedule than plain commands.
//!
//! ```text
//! execute(target, cmd, opts)
//!   ├─► sudo? (explicit flag, else inferred from the command text)
//!   │     ├─ yes ─► rewrite to `sudo -n …`, backoff base 2000ms
//!   │     └─ no  ─► command unchanged,      backoff base 1000ms
//!   └─► loop attempt = 1..=retries
//!         ├─ pool.submit(...) ── Ok ──► return
//!         ├─ final attempt or
//!         │  non-retryable    ── Err ─► return error unchanged
//!         └─ else: publish RetryScheduled, sleep base × attempt, retry
//! ```
//!
//! ## Rules
//! - Each attempt is a **new** request to the pool; requests are never
//!   re-queued.
//! - The error surfaced to the caller is the final attempt's error, not an
//!   earlier one.
//! - Only errors classified retryable by [`ExecError::is_retryable`]
//!   re-enter the loop; transport failures and a closed pool propagate
//!   immediately.

use std::sync::Arc;
use std::time::Duration;

use tokio::time;

use crate::error::ExecError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::{requires_sudo, rewrite_noninteractive, BackoffPolicy};
use crate::pool::ConnectionPool;
use crate::runner::Output;
use crate::target::Target;

/// Backoff unit for unprivileged commands.
pub const PLAIN_RETRY_BASE: Duration = Duration::from_millis(1000);
/// Backoff unit for privileged commands.
pub const SUDO_RETRY_BASE: Duration = Duration::from_millis(2000);

/// Per-command execution options.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use nodevisor::ExecOptions;
///
/// let opts = ExecOptions::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_retries(2);
/// assert_eq!(opts.retries, 2);
/// ```
#[derive(Clone, Copy, Debug)]
pub struct ExecOptions {
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Force (or suppress) the sudo path; `None` infers from the command.
    pub requires_sudo: Option<bool>,
    /// Total attempts; 1 means no retry.
    pub retries: u32,
}

impl Default for ExecOptions {
    /// `timeout = 30s`, sudo inferred, `retries = 1`.
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            requires_sudo: None,
            retries: 1,
        }
    }
}

impl ExecOptions {
    /// Sets the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Forces the sudo path on or off.
    pub fn with_sudo(mut self, requires_sudo: bool) -> Self {
        self.requires_sudo = Some(requires_sudo);
        self
    }

    /// Sets the total attempt count (clamped to ≥ 1).
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries.max(1);
        self
    }
}

/// Policy layer over the connection pool.
#[derive(Clone)]
pub struct Executor {
    pool: Arc<ConnectionPool>,
    bus: Bus,
}

impl Executor {
    /// Creates an executor over an existing pool.
    pub fn new(pool: Arc<ConnectionPool>, bus: Bus) -> Self {
        Self { pool, bus }
    }

    /// Executes one logical command with retry and sudo policy applied.
    ///
    /// The sudo path rewrites the command to `sudo -n …` (idempotent) so a
    /// missing password fails immediately instead of hanging on a prompt.
    pub async fn execute(
        &self,
        target: &Target,
        command: &str,
        opts: ExecOptions,
    ) -> Result<Output, ExecError> {
        let sudo = opts.requires_sudo.unwrap_or_else(|| requires_sudo(command));
        let (command, backoff) = if sudo {
            (
                rewrite_noninteractive(command),
                BackoffPolicy::new(SUDO_RETRY_BASE),
            )
        } else {
            (command.to_string(), BackoffPolicy::new(PLAIN_RETRY_BASE))
        };

        let attempts = opts.retries.max(1);
        let mut attempt = 1u32;
        loop {
            match self.pool.submit(target, &command, opts.timeout).await {
                Ok(out) => return Ok(out),
                Err(err) => {
                    if attempt >= attempts || !err.is_retryable() {
                        return Err(err);
                    }
                    let delay = backoff.next(attempt);
                    self.bus.publish(
                        Event::now(EventKind::RetryScheduled)
                            .with_target(target.key())
                            .with_command(command.as_str())
                            .with_attempt(attempt)
                            .with_delay(delay)
                            .with_reason(err.as_message()),
                    );
                    time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::testing::{target, RefusingTransport, ScriptResponse, ScriptedTransport};
    use crate::transport::Transport;
    use tokio::time::Instant;

    fn stack(
        transport: Arc<dyn Transport>,
    ) -> (Executor, Bus) {
        let bus = Bus::new(64);
        let pool = ConnectionPool::new(transport, bus.clone(), &Config::default());
        (Executor::new(pool, bus.clone()), bus)
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_attempted_exactly_r_times() {
        let transport = ScriptedTransport::new(|_| ScriptResponse::fail(1, "still broken"));
        let (exec, _bus) = stack(transport.clone());

        let begin = Instant::now();
        let err = exec
            .execute(&target(), "flaky", ExecOptions::default().with_retries(3))
            .await
            .unwrap_err();

        assert_eq!(transport.commands().len(), 3);
        assert!(matches!(err, ExecError::CommandFailed { exit_code: 1, .. }));
        // Plain path: 1000ms + 2000ms of inter-attempt delay.
        assert!(begin.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_second_attempt_stops_retrying() {
        let transport = ScriptedTransport::new({
            let first = std::sync::atomic::AtomicBool::new(true);
            move |_| {
                if first.swap(false, std::sync::atomic::Ordering::SeqCst) {
                    ScriptResponse::fail(1, "transient")
                } else {
                    ScriptResponse::ok("recovered")
                }
            }
        });
        let (exec, _bus) = stack(transport.clone());

        let out = exec
            .execute(&target(), "flaky", ExecOptions::default().with_retries(3))
            .await
            .unwrap();
        assert_eq!(out.stdout, "recovered");
        assert_eq!(transport.commands().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sudo_path_rewrites_and_backs_off_harder() {
        let transport = ScriptedTransport::new(|_| ScriptResponse::fail(1, "denied"));
        let (exec, _bus) = stack(transport.clone());

        let begin = Instant::now();
        let _ = exec
            .execute(
                &target(),
                "sudo systemctl restart noded",
                ExecOptions::default().with_retries(2),
            )
            .await;

        for cmd in transport.commands() {
            assert!(
                cmd.starts_with("sudo -n "),
                "expected non-interactive rewrite, got {cmd:?}"
            );
        }
        // Sudo path: one inter-attempt delay of 2000ms.
        assert!(begin.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_retries_is_single_attempt() {
        let transport = ScriptedTransport::new(|_| ScriptResponse::fail(7, "nope"));
        let (exec, _bus) = stack(transport.clone());

        let err = exec
            .execute(&target(), "once", ExecOptions::default())
            .await
            .unwrap_err();
        assert_eq!(transport.commands().len(), 1);
        assert!(matches!(err, ExecError::CommandFailed { exit_code: 7, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_not_retried() {
        let transport = RefusingTransport::new();
        let (exec, _bus) = stack(transport.clone());

        let err = exec
            .execute(&target(), "uptime", ExecOptions::default().with_retries(3))
            .await
            .unwrap_err();

        // Not classified retryable: one spawn, error surfaced unchanged.
        assert!(matches!(err, ExecError::Transport { .. }));
        assert_eq!(transport.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_events_carry_attempt_and_delay() {
        let transport = ScriptedTransport::new(|_| ScriptResponse::fail(1, "boom"));
        let (exec, bus) = stack(transport);
        let mut rx = bus.subscribe();

        let _ = exec
            .execute(&target(), "flaky", ExecOptions::default().with_retries(3))
            .await;

        let mut retries = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::RetryScheduled {
                retries.push((ev.attempt, ev.delay_ms));
            }
        }
        assert_eq!(retries, vec![(Some(1), Some(1000)), (Some(2), Some(2000))]);
    }
}
