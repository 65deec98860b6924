//! Global supervision configuration.
//!
//! [`Config`] defines everything tunable about the execution stack: the
//! managed service identity, command timeouts, reconciliation timings, and
//! pool housekeeping intervals.
//!
//! Every timing is a plain field so tests can shrink them to milliseconds.
//!
//! # Example
//! ```
//! use std::time::Duration;
//! use nodevisor::Config;
//!
//! let mut cfg = Config::default();
//! cfg.service = "noded".to_string();
//! cfg.command_timeout = Duration::from_secs(10);
//!
//! assert_eq!(cfg.service, "noded");
//! ```

use std::time::Duration;

/// Configuration for the pool, executor, and lifecycle reconciler.
#[derive(Clone, Debug)]
pub struct Config {
    /// Name of the managed background service unit.
    pub service: String,
    /// Pattern matched against the remote process list to find the node.
    pub process_pattern: String,
    /// Default per-command timeout.
    pub command_timeout: Duration,
    /// Generous timeout for privileged state-changing commands.
    pub privileged_timeout: Duration,
    /// Attempts for privileged state-changing commands (1 = no retry).
    pub privileged_retries: u32,
    /// Wait after issuing a state-changing command before re-checking.
    pub settle_delay: Duration,
    /// Interval between quiescence poll iterations.
    pub poll_interval: Duration,
    /// Maximum total time spent polling for quiescence.
    pub poll_budget: Duration,
    /// Spacing inserted between consecutive commands on one session.
    pub inter_command_delay: Duration,
    /// Idle time after which a session qualifies for reaping.
    pub idle_timeout: Duration,
    /// Interval between reaper ticks.
    pub reap_interval: Duration,
    /// Capacity of the event bus channel.
    pub bus_capacity: usize,
}

impl Default for Config {
    /// Provides the production defaults:
    /// - `service = "noded"`, `process_pattern = "noded"`
    /// - `command_timeout = 30s`, `privileged_timeout = 60s`, `privileged_retries = 2`
    /// - `settle_delay = 3s`, `poll_interval = 3s`, `poll_budget = 30s`
    /// - `inter_command_delay = 100ms`
    /// - `idle_timeout = 5min`, `reap_interval = 60s`
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            service: "noded".to_string(),
            process_pattern: "noded".to_string(),
            command_timeout: Duration::from_secs(30),
            privileged_timeout: Duration::from_secs(60),
            privileged_retries: 2,
            settle_delay: Duration::from_secs(3),
            poll_interval: Duration::from_secs(3),
            poll_budget: Duration::from_secs(30),
            inter_command_delay: Duration::from_millis(100),
            idle_timeout: Duration::from_secs(300),
            reap_interval: Duration::from_secs(60),
            bus_capacity: 1024,
        }
    }
}
