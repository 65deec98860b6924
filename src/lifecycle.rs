//! # Lifecycle reconciler: drive the node to a verified terminal state.
//!
//! [`NodeSupervisor`] issues command sequences through the executor stack
//! and polls remote state until it matches the desired state or a deadline
//! expires. "Command returned" is never trusted as "state changed".
//!
//! ```text
//! stop:   Requesting ──► WaitingForQuiescence ──► Confirmed
//!            │                  │ (3s interval, 30s budget)
//!            │ Err (fatal)      └────────────────► TimedOut (warning, still Ok)
//!            ▼
//!          Err(_)
//!
//! start:  CheckingIdle ──active──► AlreadyActive (short-circuit)
//!            │ inactive
//!            ▼
//!         Starting ──settle 3s──► recheck once ──► Confirmed / Failed
//! ```
//!
//! ## Rules
//! - Only the mandatory state-changing command may surface an `Err`; every
//!   diagnostic read degrades to a placeholder instead of failing the
//!   operation.
//! - With no [`Target`] configured, every operation answers negatively and
//!   publishes [`EventKind::NoConnection`]; absence of a connection is a
//!   valid result, not an error.
//! - Start deliberately re-checks once instead of polling like stop does;
//!   see DESIGN.md before "fixing" the asymmetry.

use tokio::time::{self, Instant};

use crate::config::Config;
use crate::error::ExecError;
use crate::events::{truncate, Bus, Event, EventKind};
use crate::exec::{ExecOptions, Executor};
use crate::target::Target;

/// Sentinel token `systemctl is-active` prints for a running unit.
const ACTIVE: &str = "active";

/// Placeholder for diagnostics that could not be collected.
pub const UNAVAILABLE: &str = "unavailable";

/// Max characters of diagnostic detail attached to failure events.
const DETAIL_PREVIEW: usize = 400;

/// Point-in-time view of the managed node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeStatus {
    /// True if the service manager reports active **or** a matching process
    /// was found in the process list.
    pub is_running: bool,
    /// Raw service-manager status token (or a placeholder).
    pub service_status: String,
    /// Process IDs matching the node's command-line signature.
    pub process_ids: Vec<String>,
    /// Free-form process listing (or a placeholder).
    pub process_details: String,
    /// Free-form service status dump (or a placeholder).
    pub service_details: String,
}

/// Drives start/stop/status reconciliation for one managed node.
///
/// Owns no persistent state; it is purely a caller of the injected
/// [`Executor`].
pub struct NodeSupervisor {
    executor: Executor,
    bus: Bus,
    config: Config,
    target: Option<Target>,
}

impl NodeSupervisor {
    /// Creates a supervisor.
    ///
    /// `target = None` puts the supervisor in degraded mode: every
    /// operation answers negatively without touching the network.
    pub fn new(executor: Executor, bus: Bus, config: Config, target: Option<Target>) -> Self {
        Self {
            executor,
            bus,
            config,
            target,
        }
    }

    /// Starts the node's service for the given network label.
    ///
    /// Short-circuits to success when the service is already active. On the
    /// slow path: issue a privileged start, settle, re-check **once**. An
    /// `Err` means the start command itself failed; `Ok(false)` means the
    /// command went through but the service did not come up.
    pub async fn start(&self, network: &str) -> Result<bool, ExecError> {
        let Some(target) = &self.target else {
            return Ok(self.no_connection("start"));
        };

        let status = self.service_status_token(target).await;
        if status == ACTIVE {
            self.bus.publish(
                Event::now(EventKind::ServiceConfirmedActive)
                    .with_target(target.key())
                    .with_reason(status),
            );
            return Ok(true);
        }

        self.bus.publish(
            Event::now(EventKind::ServiceStartIssued)
                .with_target(target.key())
                .with_reason(network),
        );
        let cmd = format!("sudo systemctl start {}", self.config.service);
        self.executor
            .execute(target, &cmd, self.privileged_opts())
            .await?;

        // The command can return before the process is actually ready.
        time::sleep(self.config.settle_delay).await;

        let status = self.service_status_token(target).await;
        if status == ACTIVE {
            self.bus.publish(
                Event::now(EventKind::ServiceConfirmedActive)
                    .with_target(target.key())
                    .with_reason(status),
            );
            Ok(true)
        } else {
            let service_detail = self
                .best_effort(target, &self.service_status_command())
                .await;
            let log_tail = self
                .best_effort(
                    target,
                    &format!(
                        "journalctl -u {} -n 20 --no-pager || true",
                        self.config.service
                    ),
                )
                .await;
            self.bus.publish(
                Event::now(EventKind::ServiceStartFailed)
                    .with_target(target.key())
                    .with_reason(truncate(
                        &format!("status={status}; {service_detail}; {log_tail}"),
                        DETAIL_PREVIEW,
                    )),
            );
            Ok(false)
        }
    }

    /// Stops the node's service and waits for quiescence.
    ///
    /// An `Err` means the stop command itself failed. A quiescence-poll
    /// timeout is a warning, never a failure: process cleanup is
    /// best-effort once the service manager accepted the stop.
    pub async fn stop(&self) -> Result<bool, ExecError> {
        let Some(target) = &self.target else {
            return Ok(self.no_connection("stop"));
        };

        self.bus
            .publish(Event::now(EventKind::ServiceStopIssued).with_target(target.key()));
        let cmd = format!("sudo systemctl stop {}", self.config.service);
        self.executor
            .execute(target, &cmd, self.privileged_opts())
            .await?;

        time::sleep(self.config.settle_delay).await;

        if self.wait_for_quiescence(target).await {
            self.bus.publish(
                Event::now(EventKind::ServiceConfirmedStopped).with_target(target.key()),
            );
        } else {
            self.bus
                .publish(Event::now(EventKind::QuiescenceTimeout).with_target(target.key()));
        }
        Ok(true)
    }

    /// Collects a full status snapshot; never fails.
    pub async fn status(&self) -> NodeStatus {
        let Some(target) = &self.target else {
            self.no_connection("status");
            return NodeStatus {
                is_running: false,
                service_status: UNAVAILABLE.to_string(),
                process_ids: Vec::new(),
                process_details: UNAVAILABLE.to_string(),
                service_details: UNAVAILABLE.to_string(),
            };
        };

        let service_status = self.service_status_token(target).await;
        let pids_raw = self.best_effort(target, &self.pgrep_command()).await;
        let process_ids: Vec<String> = if pids_raw == UNAVAILABLE {
            Vec::new()
        } else {
            pids_raw
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect()
        };
        let process_details = self
            .best_effort(
                target,
                &format!(
                    "ps -ef | grep '{}' || true",
                    masked_pattern(&self.config.process_pattern)
                ),
            )
            .await;
        let service_details = self
            .best_effort(target, &self.service_status_command())
            .await;

        // Either signal counts: a node orphaned from its unit is running.
        let is_running = service_status == ACTIVE || !process_ids.is_empty();
        NodeStatus {
            is_running,
            service_status,
            process_ids,
            process_details,
            service_details,
        }
    }

    /// True if a process matching the node's signature exists remotely.
    pub async fn is_process_running(&self) -> bool {
        match &self.target {
            Some(target) => self.probe_process(target).await,
            None => self.no_connection("is_process_running"),
        }
    }

    fn privileged_opts(&self) -> ExecOptions {
        ExecOptions::default()
            .with_timeout(self.config.privileged_timeout)
            .with_sudo(true)
            .with_retries(self.config.privileged_retries)
    }

    fn pgrep_command(&self) -> String {
        // `|| true` keeps the exit code zero when nothing matches, so an
        // empty match is an answer rather than a CommandFailed.
        format!(
            "pgrep -f '{}' || true",
            masked_pattern(&self.config.process_pattern)
        )
    }

    fn service_status_command(&self) -> String {
        format!("systemctl status {} --no-pager || true", self.config.service)
    }

    /// Current `is-active` token, or a placeholder when unreadable.
    async fn service_status_token(&self, target: &Target) -> String {
        let cmd = format!("systemctl is-active {} || true", self.config.service);
        match self
            .executor
            .execute(
                target,
                &cmd,
                ExecOptions::default().with_timeout(self.config.command_timeout),
            )
            .await
        {
            Ok(out) => out.stdout.trim().to_string(),
            Err(_) => UNAVAILABLE.to_string(),
        }
    }

    /// Polls until no matching process remains or the budget expires.
    ///
    /// Returns `true` on observed quiescence.
    async fn wait_for_quiescence(&self, target: &Target) -> bool {
        let deadline = Instant::now() + self.config.poll_budget;
        loop {
            if !self.probe_process(target).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            time::sleep(self.config.poll_interval).await;
        }
    }

    /// Best-effort process probe; an unreadable process list counts as
    /// absent.
    async fn probe_process(&self, target: &Target) -> bool {
        match self
            .executor
            .execute(
                target,
                &self.pgrep_command(),
                ExecOptions::default().with_timeout(self.config.command_timeout),
            )
            .await
        {
            Ok(out) => !out.stdout.trim().is_empty(),
            Err(_) => false,
        }
    }

    /// Wraps a fallible diagnostic read; any failure maps to a placeholder
    /// instead of aborting the caller.
    async fn best_effort(&self, target: &Target, command: &str) -> String {
        match self
            .executor
            .execute(
                target,
                command,
                ExecOptions::default().with_timeout(self.config.command_timeout),
            )
            .await
        {
            Ok(out) => out.stdout,
            Err(_) => UNAVAILABLE.to_string(),
        }
    }

    fn no_connection(&self, op: &str) -> bool {
        self.bus
            .publish(Event::now(EventKind::NoConnection).with_reason(op));
        false
    }
}

/// Brackets the pattern's first character: `noded` becomes `[n]oded`.
///
/// The remote side runs probes under a wrapper shell whose own command line
/// contains the pattern text, so an unmasked `pgrep -f`/`grep` matches the
/// probe itself and reports a phantom process. The bracketed form is the
/// same regex but no longer a substring of the command that carries it.
///
/// A first character with meaning inside a bracket class is left alone; the
/// trick only needs to work for the plain process names it is used with.
fn masked_pattern(pattern: &str) -> String {
    let mut chars = pattern.chars();
    match chars.next() {
        Some(c) if !['[', ']', '^', '\\'].contains(&c) => {
            format!("[{}]{}", c, chars.as_str())
        }
        _ => pattern.to_string(),
    }
}
