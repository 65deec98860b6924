//! # Connection pool: one logical session per target identity.
//!
//! The pool maps `user@host` keys to sessions. Each session owns a FIFO
//! mailbox drained by a single worker task, so commands against one identity
//! execute strictly one at a time, in submission order, with a fixed
//! inter-command delay. Commands against different identities are
//! independent and may run concurrently.
//!
//! ## Architecture
//! ```text
//! submit(target, cmd) ──► sessions[user@host] ──► mailbox ──► worker ──► runner
//!                              │                                │
//!                              │ created lazily                 │ one request
//!                              ▼                                ▼ at a time
//!                          reaper (periodic tick, idle removal, self-stopping)
//! ```
//!
//! ## Rules
//! - Sessions are created lazily on first submit for an identity.
//! - The first live session arms the reaper; the reaper stops itself when
//!   no sessions remain.
//! - Reaping only removes sessions that are idle past the threshold and not
//!   busy; a reaped worker still drains requests already in its mailbox.
//! - `shutdown` is unconditional: workers are aborted and every pending
//!   request resolves to [`ExecError::PoolClosed`].

mod session;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::ExecError;
use crate::events::{Bus, Event, EventKind};
use crate::runner::Output;
use crate::target::Target;
use crate::transport::Transport;

use session::{session_worker, CommandRequest, SessionHandle, SessionState};

/// Pool of per-identity sessions with FIFO command queues.
pub struct ConnectionPool {
    transport: Arc<dyn Transport>,
    bus: Bus,
    inter_command_delay: Duration,
    idle_timeout: Duration,
    reap_interval: Duration,
    sessions: RwLock<HashMap<String, SessionHandle>>,
    reaper: Mutex<Option<CancellationToken>>,
}

impl ConnectionPool {
    /// Creates a pool over the given transport.
    pub fn new(transport: Arc<dyn Transport>, bus: Bus, config: &Config) -> Arc<Self> {
        Arc::new(Self {
            transport,
            bus,
            inter_command_delay: config.inter_command_delay,
            idle_timeout: config.idle_timeout,
            reap_interval: config.reap_interval,
            sessions: RwLock::new(HashMap::new()),
            reaper: Mutex::new(None),
        })
    }

    /// Submits one command for `target` and awaits its result.
    ///
    /// ### Ordering guarantee
    /// Results for one identity resolve in submission order; no two
    /// commands on the same identity overlap in time. Identities do not
    /// order relative to each other.
    ///
    /// Returns [`ExecError::PoolClosed`] if the pool is torn down before
    /// the command completes.
    pub async fn submit(
        self: &Arc<Self>,
        target: &Target,
        command: &str,
        timeout: Duration,
    ) -> Result<Output, ExecError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.enqueue(
            target,
            CommandRequest {
                command: command.to_string(),
                timeout,
                reply: reply_tx,
            },
        )
        .await;

        match reply_rx.await {
            Ok(res) => res,
            Err(_) => Err(ExecError::PoolClosed),
        }
    }

    async fn enqueue(self: &Arc<Self>, target: &Target, req: CommandRequest) {
        let key = target.key();
        let mut created = false;
        {
            let mut sessions = self.sessions.write().await;
            let needs_new = match sessions.get(&key) {
                // A closed mailbox means the worker is gone (reaped between
                // our lookup and now); replace it.
                Some(handle) => handle.tx.is_closed(),
                None => true,
            };
            if needs_new {
                sessions.insert(key.clone(), self.spawn_session(target));
                created = true;
            }
            if let Some(handle) = sessions.get(&key) {
                handle.state.touch();
                let _ = handle.tx.send(req);
            }
        }
        if created {
            self.ensure_reaper().await;
        }
    }

    fn spawn_session(&self, target: &Target) -> SessionHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = SessionState::new();
        let join = tokio::spawn(session_worker(
            self.transport.clone(),
            self.bus.clone(),
            target.clone(),
            state.clone(),
            rx,
            self.inter_command_delay,
        ));
        self.bus
            .publish(Event::now(EventKind::SessionOpened).with_target(target.key()));
        SessionHandle { tx, state, join }
    }

    /// Arms the reaper if it is not already running.
    async fn ensure_reaper(self: &Arc<Self>) {
        let mut slot = self.reaper.lock().await;
        if slot.is_none() {
            let token = CancellationToken::new();
            *slot = Some(token.clone());
            let pool = Arc::clone(self);
            tokio::spawn(async move { pool.reap_loop(token).await });
        }
    }

    /// Periodic tick: drop idle sessions, stop once the map empties.
    async fn reap_loop(self: Arc<Self>, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = time::sleep(self.reap_interval) => {}
            }

            let mut reaped = Vec::new();
            {
                let mut sessions = self.sessions.write().await;
                sessions.retain(|key, handle| {
                    let keep =
                        handle.state.is_busy() || handle.state.idle_for() < self.idle_timeout;
                    if !keep {
                        reaped.push(key.clone());
                    }
                    keep
                });
                // Removing a handle drops the pool's sender; the worker
                // drains whatever was already queued, then exits.
            }
            for key in reaped {
                self.bus
                    .publish(Event::now(EventKind::SessionReaped).with_target(key));
            }

            if self.sessions.read().await.is_empty() {
                let mut slot = self.reaper.lock().await;
                // Re-check under the slot lock: a session created after the
                // emptiness check must not be left without a reaper.
                if self.sessions.read().await.is_empty() {
                    *slot = None;
                    self.bus.publish(Event::now(EventKind::ReaperStopped));
                    return;
                }
            }
        }
    }

    /// Tears the pool down unconditionally.
    ///
    /// Stops the reaper, drops every session, and aborts the workers.
    /// Callers with outstanding submissions observe
    /// [`ExecError::PoolClosed`].
    pub async fn shutdown(&self) {
        if let Some(token) = self.reaper.lock().await.take() {
            token.cancel();
        }
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.join.abort();
        }
        self.bus.publish(Event::now(EventKind::PoolShutdown));
    }

    /// Number of live sessions (diagnostics and tests).
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
