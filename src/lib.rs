//! # nodevisor
//!
//! **Nodevisor** provisions and supervises a long-running network-node
//! process on remote hosts over SSH.
//!
//! It provides a pooled, ordered command-execution stack and a lifecycle
//! reconciler that drives the remote service to a verified state instead of
//! trusting that "command returned" means "state changed". The crate is
//! designed as a building block for higher-level deployment tooling.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!           ┌────────────────────────────────────────────────┐
//!           │  NodeSupervisor (lifecycle reconciler)         │
//!           │  - start: check ► issue ► settle ► recheck     │
//!           │  - stop:  issue ► settle ► poll to quiescence  │
//!           │  - status: service token + process probe       │
//!           └──────────────────────┬─────────────────────────┘
//!                                  ▼
//!           ┌────────────────────────────────────────────────┐
//!           │  Executor (retry + sudo policy)                │
//!           │  - rewrites privileged commands to `sudo -n`   │
//!           │  - linear backoff, slower on the sudo path     │
//!           └──────────────────────┬─────────────────────────┘
//!                                  ▼
//!           ┌────────────────────────────────────────────────┐
//!           │  ConnectionPool (one session per user@host)    │
//!           │  - FIFO mailbox, single worker per session     │
//!           │  - inter-command spacing, idle reaper          │
//!           └──────┬─────────────────────┬───────────────────┘
//!                  ▼                     ▼
//!           ┌─────────────┐       ┌─────────────┐
//!           │   worker    │  ...  │   worker    │  (one per identity)
//!           │ run_command │       │ run_command │
//!           └──────┬──────┘       └──────┬──────┘
//!                  ▼                     ▼
//!           ┌────────────────────────────────────────────────┐
//!           │  Transport (SshTransport: one `ssh` per cmd)   │
//!           └────────────────────────────────────────────────┘
//!
//!  Every layer publishes Events to a broadcast Bus; observers
//!  (LogWriter or custom) consume the stream off the command path.
//! ```
//!
//! ### Command lifecycle
//! ```text
//! execute(target, cmd, opts)
//!   ├─► sudo detection / `sudo -n` rewrite
//!   └─► loop attempt = 1..=retries
//!         ├─► pool.submit ─► session mailbox (FIFO per user@host)
//!         │        └─► worker: run_command
//!         │              ├─ publish CommandStarting
//!         │              ├─ stream stdout/stderr lines
//!         │              ├─ deadline hit ─► Term, grace, Kill ─► Err(Timeout)
//!         │              ├─ exit 0  ─► Ok(Output)
//!         │              └─ exit ≠0 ─► Err(CommandFailed)
//!         ├─ Ok ──────────► return
//!         ├─ final attempt ► return error unchanged
//!         └─ else ────────► publish RetryScheduled, sleep base × attempt
//! ```
//!
//! ## Features
//! | Area           | Description                                               | Key types / traits                        |
//! |----------------|-----------------------------------------------------------|-------------------------------------------|
//! | **Lifecycle**  | Start/stop/status reconciliation with verification.       | [`NodeSupervisor`], [`NodeStatus`]        |
//! | **Execution**  | Retry and privilege policy over pooled sessions.          | [`Executor`], [`ExecOptions`]             |
//! | **Pooling**    | Per-identity FIFO sessions with idle reaping.             | [`ConnectionPool`]                        |
//! | **Transport**  | Pluggable remote channel; SSH out of the box.             | [`Transport`], [`SshTransport`]           |
//! | **Observability** | Broadcast event stream with pluggable observers.       | [`Bus`], [`Event`], [`Observer`]          |
//! | **Errors**     | Typed errors with retryability classification.            | [`ExecError`]                             |
//! | **Configuration** | Centralized timings and service identity.              | [`Config`]                                |
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use nodevisor::{
//!     Bus, Config, ConnectionPool, Executor, LogWriter, NodeSupervisor, Observer,
//!     SshTransport, Target, spawn_listener,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let bus = Bus::new(config.bus_capacity);
//!
//!     // Wire a logging observer to the event stream.
//!     let token = CancellationToken::new();
//!     let observers: Vec<Arc<dyn Observer>> = vec![Arc::new(LogWriter::new(false))];
//!     spawn_listener(&bus, observers, token.clone());
//!
//!     let pool = ConnectionPool::new(Arc::new(SshTransport::new()), bus.clone(), &config);
//!     let executor = Executor::new(pool.clone(), bus.clone());
//!
//!     let target = Target::new("/home/ops/.ssh/id_ed25519", "ops", "validator-1.example.com");
//!     let supervisor = NodeSupervisor::new(executor, bus.clone(), config, Some(target));
//!
//!     if supervisor.start("mainnet").await? {
//!         println!("node is up: {:?}", supervisor.status().await);
//!     }
//!
//!     supervisor.stop().await?;
//!     pool.shutdown().await;
//!     token.cancel();
//!     Ok(())
//! }
//! ```
mod config;
mod error;
mod events;
mod exec;
mod lifecycle;
mod observers;
mod policies;
mod pool;
mod runner;
mod target;
mod transport;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use config::Config;
pub use error::ExecError;
pub use events::{Bus, Event, EventKind};
pub use exec::{ExecOptions, Executor, PLAIN_RETRY_BASE, SUDO_RETRY_BASE};
pub use lifecycle::{NodeStatus, NodeSupervisor, UNAVAILABLE};
pub use observers::{spawn_listener, LogWriter, Observer};
pub use policies::{requires_sudo, rewrite_noninteractive, BackoffPolicy};
pub use pool::ConnectionPool;
pub use runner::{run_command, Output, KILL_GRACE};
pub use target::Target;
pub use transport::{RemoteChild, Signal, SshTransport, Transport};
