//! # Run one remote command against one transport session.
//!
//! [`run_command`] drives a single remote invocation from spawn to a
//! classified result, publishing command lifecycle [`Event`]s to the
//! [`Bus`].
//!
//! ```text
//!   ┌───────────┐
//!   │ Transport │
//!   └─────┬─────┘
//!     spawn(cmd)
//!         ▼
//!   stream lines ──► accumulate ──► normalize
//!         │
//!         ├─ exit 0        ──► Ok(Output)
//!         ├─ exit nonzero  ──► Err(CommandFailed)
//!         └─ deadline hit  ──► Term ──(5s grace)──► Kill ──► Err(Timeout)
//! ```
//!
//! ## Rules
//! - One transport session per call; no retries here (policy-layer concern).
//! - Output is normalized at completion: trailing whitespace and control
//!   noise stripped, so callers can pattern-match on content.
//! - Event publishing never blocks completion (broadcast send is sync).

use std::time::Duration;

use tokio::time::{self, Instant};

use crate::error::ExecError;
use crate::events::{truncate, Bus, Event, EventKind};
use crate::target::Target;
use crate::transport::{RemoteChild, Signal, Transport};

/// Time allowed between graceful and forceful termination.
pub const KILL_GRACE: Duration = Duration::from_secs(5);

/// Max characters of output preview attached to completion events.
const PREVIEW: usize = 160;

/// Normalized output of a successful remote command.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Output {
    /// Standard output, trailing noise stripped.
    pub stdout: String,
    /// Standard error, trailing noise stripped.
    pub stderr: String,
}

/// Executes one command on `target` with a hard `timeout`.
///
/// ### Completion classification
/// - exit code 0 → `Ok` with the normalized output pair
/// - nonzero exit → [`ExecError::CommandFailed`]
/// - timeout → graceful [`Signal::Term`], then [`Signal::Kill`] after
///   [`KILL_GRACE`], then [`ExecError::Timeout`]
/// - spawn or I/O failure → [`ExecError::Transport`]
pub async fn run_command(
    transport: &dyn Transport,
    bus: &Bus,
    target: &Target,
    command: &str,
    timeout: Duration,
) -> Result<Output, ExecError> {
    let started = Instant::now();
    bus.publish(
        Event::now(EventKind::CommandStarting)
            .with_target(target.key())
            .with_command(command),
    );

    let child = transport.spawn(target, command).await.map_err(|e| {
        publish_failed(bus, target, command, started, &e);
        e
    })?;
    let RemoteChild {
        mut stdout,
        mut stderr,
        signals,
        mut exit,
    } = child;

    let mut out_buf = String::new();
    let mut err_buf = String::new();
    let mut out_open = true;
    let mut err_open = true;

    let deadline = time::sleep(timeout);
    tokio::pin!(deadline);

    let code = loop {
        tokio::select! {
            line = stdout.recv(), if out_open => match line {
                Some(l) => push_line(&mut out_buf, &l),
                None => out_open = false,
            },
            line = stderr.recv(), if err_open => match line {
                Some(l) => push_line(&mut err_buf, &l),
                None => err_open = false,
            },
            res = &mut exit => match res {
                Ok(Ok(code)) => break code,
                Ok(Err(e)) => {
                    let err = ExecError::Transport { error: e.to_string() };
                    publish_failed(bus, target, command, started, &err);
                    return Err(err);
                }
                Err(_) => {
                    let err = ExecError::Transport {
                        error: "session driver dropped before exit".to_string(),
                    };
                    publish_failed(bus, target, command, started, &err);
                    return Err(err);
                }
            },
            _ = &mut deadline => {
                let elapsed = started.elapsed();
                bus.publish(
                    Event::now(EventKind::TimeoutHit)
                        .with_target(target.key())
                        .with_command(command)
                        .with_elapsed(elapsed),
                );
                let _ = signals.send(Signal::Term);

                let grace = time::sleep(KILL_GRACE);
                tokio::pin!(grace);
                tokio::select! {
                    _ = &mut exit => {}
                    _ = &mut grace => {
                        let _ = signals.send(Signal::Kill);
                    }
                }
                return Err(ExecError::Timeout {
                    elapsed,
                    command: command.to_string(),
                });
            }
        }
    };

    // Exit observed; readers close at pipe EOF, so draining terminates.
    while let Some(l) = stdout.recv().await {
        push_line(&mut out_buf, &l);
    }
    while let Some(l) = stderr.recv().await {
        push_line(&mut err_buf, &l);
    }

    let elapsed = started.elapsed();
    let output = Output {
        stdout: normalize(&out_buf),
        stderr: normalize(&err_buf),
    };

    match code {
        Some(0) => {
            bus.publish(
                Event::now(EventKind::CommandCompleted)
                    .with_target(target.key())
                    .with_command(command)
                    .with_elapsed(elapsed)
                    .with_reason(truncate(&output.stdout, PREVIEW)),
            );
            Ok(output)
        }
        code => {
            // None means the remote invocation died to a signal.
            let err = ExecError::CommandFailed {
                exit_code: code.unwrap_or(-1),
                stderr: output.stderr,
            };
            publish_failed(bus, target, command, started, &err);
            Err(err)
        }
    }
}

fn publish_failed(bus: &Bus, target: &Target, command: &str, started: Instant, err: &ExecError) {
    bus.publish(
        Event::now(EventKind::CommandFailed)
            .with_target(target.key())
            .with_command(command)
            .with_elapsed(started.elapsed())
            .with_reason(truncate(&err.as_message(), PREVIEW)),
    );
}

fn push_line(buf: &mut String, line: &str) {
    if !buf.is_empty() {
        buf.push('\n');
    }
    buf.push_str(line.trim_end_matches('\r'));
}

fn normalize(s: &str) -> String {
    s.trim_end_matches(|c: char| c.is_whitespace() || c.is_control())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{target, HangingTransport, ScriptResponse, ScriptedTransport};

    fn bus() -> Bus {
        Bus::new(64)
    }

    #[tokio::test]
    async fn test_success_normalizes_output() {
        let transport = ScriptedTransport::new(|_| ScriptResponse::ok("hello\r\n\n"));
        let out = run_command(
            transport.as_ref(),
            &bus(),
            &target(),
            "echo hello",
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(out.stdout, "hello");
        assert_eq!(out.stderr, "");
    }

    #[tokio::test]
    async fn test_nonzero_exit_surfaces_stderr() {
        let transport = ScriptedTransport::new(|_| ScriptResponse::fail(2, "no such unit"));
        let err = run_command(
            transport.as_ref(),
            &bus(),
            &target(),
            "systemctl start ghost",
            Duration::from_secs(5),
        )
        .await
        .unwrap_err();
        match err {
            ExecError::CommandFailed { exit_code, stderr } => {
                assert_eq!(exit_code, 2);
                assert_eq!(stderr, "no such unit");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_escalates_term_then_kill() {
        let transport = HangingTransport::new();
        let begin = Instant::now();
        let timeout = Duration::from_secs(10);

        let err = run_command(
            transport.as_ref(),
            &bus(),
            &target(),
            "sleep 9999",
            timeout,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ExecError::Timeout { .. }));
        // Full escalation: deadline plus the kill grace window.
        assert!(begin.elapsed() >= timeout + KILL_GRACE);

        // run_command returns right after queueing Kill; yield so the
        // recorder task can log it before we observe the signal trail.
        while transport.signals().len() < 2 {
            tokio::task::yield_now().await;
        }
        let signals = transport.signals();
        assert_eq!(
            signals.iter().map(|(s, _)| *s).collect::<Vec<_>>(),
            vec![Signal::Term, Signal::Kill],
        );
        let term_at = signals[0].1;
        let kill_at = signals[1].1;
        assert!(term_at - begin >= timeout);
        assert!(kill_at - term_at >= KILL_GRACE);
    }

    #[tokio::test]
    async fn test_timeout_event_published() {
        tokio::time::pause();
        let transport = HangingTransport::new();
        let bus = bus();
        let mut rx = bus.subscribe();

        let _ = run_command(
            transport.as_ref(),
            &bus,
            &target(),
            "sleep 9999",
            Duration::from_millis(100),
        )
        .await;

        let mut saw_timeout = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::TimeoutHit {
                saw_timeout = true;
            }
        }
        assert!(saw_timeout);
    }
}
