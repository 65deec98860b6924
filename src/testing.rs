//! Test doubles shared by module tests.
//!
//! [`ScriptedTransport`] answers each spawned command from a responder
//! closure and records every invocation, plus an overlap counter that trips
//! if two invocations are ever in flight at once. [`RefusingTransport`]
//! fails every spawn outright. [`HangingTransport`] simulates a session that
//! never exits on its own and records the signals it receives.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::error::ExecError;
use crate::target::Target;
use crate::transport::{RemoteChild, Signal, Transport};

pub(crate) fn target() -> Target {
    Target::new("/tmp/test-key", "ops", "node.test")
}

/// Canned response for one command.
#[derive(Clone, Debug)]
pub(crate) struct ScriptResponse {
    pub exit: i32,
    pub stdout: String,
    pub stderr: String,
    pub delay: Duration,
}

impl ScriptResponse {
    pub fn ok(stdout: &str) -> Self {
        Self {
            exit: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn fail(exit: i32, stderr: &str) -> Self {
        Self {
            exit,
            stdout: String::new(),
            stderr: stderr.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Responder = dyn Fn(&str) -> ScriptResponse + Send + Sync;

/// Transport that answers commands from a responder closure.
pub(crate) struct ScriptedTransport {
    respond: Box<Responder>,
    log: Mutex<Vec<String>>,
    in_flight: Arc<AtomicBool>,
    overlaps: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(respond: impl Fn(&str) -> ScriptResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            log: Mutex::new(Vec::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
            overlaps: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Every command spawned, in spawn order.
    pub fn commands(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    /// Number of times a spawn happened while another was still in flight.
    pub fn overlaps(&self) -> usize {
        self.overlaps.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn spawn(&self, _target: &Target, command: &str) -> Result<RemoteChild, ExecError> {
        self.log.lock().unwrap().push(command.to_string());
        if self.in_flight.swap(true, Ordering::SeqCst) {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        let resp = (self.respond)(command);

        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let (sig_tx, sig_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        let in_flight = self.in_flight.clone();
        tokio::spawn(async move {
            // Hold the signal receiver so runner sends stay valid.
            let _sig_rx = sig_rx;
            if resp.delay > Duration::ZERO {
                tokio::time::sleep(resp.delay).await;
            }
            for line in resp.stdout.lines() {
                let _ = out_tx.send(line.to_string());
            }
            for line in resp.stderr.lines() {
                let _ = err_tx.send(line.to_string());
            }
            drop(out_tx);
            drop(err_tx);
            in_flight.store(false, Ordering::SeqCst);
            let _ = exit_tx.send(Ok(Some(resp.exit)));
        });

        Ok(RemoteChild::from_parts(out_rx, err_rx, sig_tx, exit_rx))
    }
}

/// Transport whose spawns always fail, counting the attempts.
pub(crate) struct RefusingTransport {
    attempts: AtomicUsize,
}

impl RefusingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
        })
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for RefusingTransport {
    async fn spawn(&self, _target: &Target, _command: &str) -> Result<RemoteChild, ExecError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(ExecError::Transport {
            error: "connection refused".to_string(),
        })
    }
}

/// Transport whose sessions never exit until killed.
///
/// Records each received signal with the (tokio) instant it arrived. The
/// session reports an exit only after [`Signal::Kill`].
pub(crate) struct HangingTransport {
    signals: Arc<Mutex<Vec<(Signal, Instant)>>>,
}

impl HangingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            signals: Arc::new(Mutex::new(Vec::new())),
        })
    }

    pub fn signals(&self) -> Vec<(Signal, Instant)> {
        self.signals.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for HangingTransport {
    async fn spawn(&self, _target: &Target, _command: &str) -> Result<RemoteChild, ExecError> {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        let (sig_tx, mut sig_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = oneshot::channel();

        let log = self.signals.clone();
        tokio::spawn(async move {
            // Keep output streams open forever, like a wedged remote command.
            let _keep_out = out_tx;
            let _keep_err = err_tx;
            let mut exit_tx = Some(exit_tx);
            while let Some(sig) = sig_rx.recv().await {
                log.lock().unwrap().push((sig, Instant::now()));
                if sig == Signal::Kill {
                    if let Some(tx) = exit_tx.take() {
                        let _ = tx.send(Ok(None));
                    }
                    break;
                }
            }
        });

        Ok(RemoteChild::from_parts(out_rx, err_rx, sig_tx, exit_rx))
    }
}
