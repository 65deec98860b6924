use async_trait::async_trait;

use crate::events::{truncate, Event, EventKind};
use crate::observers::Observer;

/// Max characters of command/output text rendered per line.
const PREVIEW: usize = 160;

/// Base observer that logs events to stdout.
///
/// Lifecycle milestones and warnings are always printed; per-command
/// diagnostics (start/complete lines with elapsed time and output previews)
/// only when `verbose` is set.
pub struct LogWriter {
    verbose: bool,
}

impl LogWriter {
    /// Creates a writer; `verbose` enables per-command diagnostics.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

#[async_trait]
impl Observer for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::CommandStarting => {
                if self.verbose {
                    if let (Some(target), Some(cmd)) = (&e.target, &e.command) {
                        println!("[exec] target={target} cmd={}", truncate(cmd, PREVIEW));
                    }
                }
            }
            EventKind::CommandCompleted => {
                if self.verbose {
                    println!(
                        "[done] target={:?} elapsed_ms={:?} out={:?}",
                        e.target, e.elapsed_ms, e.reason
                    );
                }
            }
            EventKind::CommandFailed => {
                if self.verbose {
                    println!(
                        "[fail] target={:?} elapsed_ms={:?} err={:?}",
                        e.target, e.elapsed_ms, e.reason
                    );
                }
            }
            EventKind::TimeoutHit => {
                println!(
                    "[timeout] target={:?} cmd={:?} elapsed_ms={:?}",
                    e.target, e.command, e.elapsed_ms
                );
            }
            EventKind::RetryScheduled => {
                println!(
                    "[retry] target={:?} attempt={:?} delay_ms={:?} err={:?}",
                    e.target, e.attempt, e.delay_ms, e.reason
                );
            }
            EventKind::SessionOpened => {
                if self.verbose {
                    println!("[session-opened] target={:?}", e.target);
                }
            }
            EventKind::SessionReaped => {
                if self.verbose {
                    println!("[session-reaped] target={:?}", e.target);
                }
            }
            EventKind::ReaperStopped => {
                if self.verbose {
                    println!("[reaper-stopped]");
                }
            }
            EventKind::PoolShutdown => {
                println!("[pool-shutdown]");
            }
            EventKind::ServiceStartIssued => {
                println!("[service-start] target={:?} network={:?}", e.target, e.reason);
            }
            EventKind::ServiceStopIssued => {
                println!("[service-stop] target={:?}", e.target);
            }
            EventKind::ServiceConfirmedActive => {
                println!("[service-active] target={:?} status={:?}", e.target, e.reason);
            }
            EventKind::ServiceConfirmedStopped => {
                println!("[service-stopped] target={:?}", e.target);
            }
            EventKind::ServiceStartFailed => {
                println!("[service-start-failed] target={:?} detail={:?}", e.target, e.reason);
            }
            EventKind::QuiescenceTimeout => {
                println!("[quiescence-timeout] target={:?}", e.target);
            }
            EventKind::NoConnection => {
                println!("[no-connection] op={:?}", e.reason);
            }
        }
    }
}
