//! Runtime events emitted by the execution stack.
//!
//! [`EventKind`] classifies events across four categories:
//! - **Command events**: one remote command's flow (starting, completed,
//!   failed, timeout).
//! - **Policy events**: retry scheduling.
//! - **Pool events**: session lifecycle and housekeeping.
//! - **Lifecycle events**: service start/stop reconciliation milestones.
//!
//! The [`Event`] struct carries optional metadata (target key, command text,
//! attempt number, delays, elapsed time, free-form reason).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events are consumed
//! out of band.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Command events ===
    /// A remote command was dequeued and is about to run.
    ///
    /// Sets: `target`, `command`, `at`, `seq`.
    CommandStarting,

    /// A remote command exited zero.
    ///
    /// Sets: `target`, `command`, `elapsed_ms`, `reason` (truncated stdout),
    /// `at`, `seq`.
    CommandCompleted,

    /// A remote command failed (nonzero exit or transport error).
    ///
    /// Sets: `target`, `command`, `elapsed_ms`, `reason` (error message),
    /// `at`, `seq`.
    CommandFailed,

    /// A remote command exceeded its timeout and is being terminated.
    ///
    /// Sets: `target`, `command`, `elapsed_ms`, `at`, `seq`.
    TimeoutHit,

    // === Policy events ===
    /// A failed attempt will be retried after a delay.
    ///
    /// Sets: `target`, `command`, `attempt` (the attempt that failed),
    /// `delay_ms`, `reason` (last error), `at`, `seq`.
    RetryScheduled,

    // === Pool events ===
    /// A new pooled session was created for a target.
    ///
    /// Sets: `target`, `at`, `seq`.
    SessionOpened,

    /// An idle session was removed by the reaper.
    ///
    /// Sets: `target`, `at`, `seq`.
    SessionReaped,

    /// The reaper stopped itself because no sessions remain.
    ///
    /// Sets: `at`, `seq`.
    ReaperStopped,

    /// The pool was torn down; all sessions dropped.
    ///
    /// Sets: `at`, `seq`.
    PoolShutdown,

    // === Lifecycle events ===
    /// A privileged "start service" command is being issued.
    ///
    /// Sets: `target`, `reason` (network label), `at`, `seq`.
    ServiceStartIssued,

    /// A privileged "stop service" command is being issued.
    ///
    /// Sets: `target`, `at`, `seq`.
    ServiceStopIssued,

    /// The service was observed active (short-circuit or post-start check).
    ///
    /// Sets: `target`, `reason` (current status token), `at`, `seq`.
    ServiceConfirmedActive,

    /// The managed process was observed absent after a stop.
    ///
    /// Sets: `target`, `at`, `seq`.
    ServiceConfirmedStopped,

    /// The service did not come up after a start; diagnostics attached.
    ///
    /// Sets: `target`, `reason` (truncated status/log detail), `at`, `seq`.
    ServiceStartFailed,

    /// The quiescence poll budget expired with the process still present.
    ///
    /// Non-fatal: the stop still reports success if the stop command itself
    /// succeeded.
    ///
    /// Sets: `target`, `at`, `seq`.
    QuiescenceTimeout,

    /// A lifecycle operation was requested with no target configured.
    ///
    /// Sets: `reason` (operation name), `at`, `seq`.
    NoConnection,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Pool key (`user@host`) of the target, if applicable.
    pub target: Option<Arc<str>>,
    /// Command text, if applicable.
    pub command: Option<Arc<str>>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u32>,
    /// Retry delay before the next attempt, in milliseconds.
    pub delay_ms: Option<u32>,
    /// Wall-clock time the command took, in milliseconds.
    pub elapsed_ms: Option<u64>,
    /// Human-readable detail (error text, output preview, status token).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            target: None,
            command: None,
            attempt: None,
            delay_ms: None,
            elapsed_ms: None,
            reason: None,
        }
    }

    /// Attaches the target's pool key.
    #[inline]
    pub fn with_target(mut self, target: impl Into<Arc<str>>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Attaches the command text.
    #[inline]
    pub fn with_command(mut self, command: impl Into<Arc<str>>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Attaches an attempt count.
    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an elapsed duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u64::MAX)) as u64;
        self.elapsed_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Clips a string to `max` characters on a char boundary, appending an
/// ellipsis marker when anything was cut.
pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let clipped: String = s.chars().take(max).collect();
    format!("{clipped}…")
}
