//! Per-session state and the single-consumer worker loop.
//!
//! One worker task owns one session's mailbox. Strict FIFO and the
//! one-command-in-flight invariant fall out of the channel: there is exactly
//! one consumer, and it never holds more than one request at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::error::ExecError;
use crate::events::Bus;
use crate::runner::{run_command, Output};
use crate::target::Target;
use crate::transport::Transport;

/// One queued command awaiting its turn on a session.
pub(crate) struct CommandRequest {
    pub command: String,
    pub timeout: Duration,
    pub reply: oneshot::Sender<Result<Output, ExecError>>,
}

/// Pool-side handle to one session.
pub(crate) struct SessionHandle {
    /// Mailbox feeding the worker.
    pub tx: mpsc::UnboundedSender<CommandRequest>,
    /// Busy/idle bookkeeping shared with the worker.
    pub state: Arc<SessionState>,
    /// The worker task; aborted only on full pool teardown.
    pub join: JoinHandle<()>,
}

/// Busy flag and last-used timestamp, shared between the pool's reaper and
/// a session worker.
pub(crate) struct SessionState {
    busy: AtomicBool,
    last_used: Mutex<Instant>,
}

impl SessionState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            busy: AtomicBool::new(false),
            last_used: Mutex::new(Instant::now()),
        })
    }

    /// Marks the session as used right now.
    pub fn touch(&self) {
        if let Ok(mut at) = self.last_used.lock() {
            *at = Instant::now();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Time since the last enqueue or completed command.
    pub fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .map(|at| at.elapsed())
            .unwrap_or(Duration::ZERO)
    }

    fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }
}

/// Drains one session's mailbox.
///
/// Exits when every sender is dropped **and** the buffered queue is empty,
/// so a reaped session still finishes requests that were already queued —
/// reaping never discards in-flight work.
pub(crate) async fn session_worker(
    transport: Arc<dyn Transport>,
    bus: Bus,
    target: Target,
    state: Arc<SessionState>,
    mut rx: mpsc::UnboundedReceiver<CommandRequest>,
    spacing: Duration,
) {
    while let Some(req) = rx.recv().await {
        state.set_busy(true);
        let res = run_command(
            transport.as_ref(),
            &bus,
            &target,
            &req.command,
            req.timeout,
        )
        .await;
        // Receiver may have given up; the command still ran.
        let _ = req.reply.send(res);
        state.touch();
        state.set_busy(false);

        // Spacing keeps the remote shell from being saturated by
        // back-to-back invocations.
        if spacing > Duration::ZERO {
            time::sleep(spacing).await;
        }
    }
}
