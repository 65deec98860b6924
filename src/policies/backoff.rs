//! # Backoff policy for retrying commands.
//!
//! [`BackoffPolicy`] computes the delay before the next attempt of a failed
//! command. The schedule is linear and fully deterministic: attempt `n`
//! (1-based) waits `base × n`. The base differs per execution path — the
//! sudo path backs off twice as hard as the plain path, because a failed
//! privileged command usually means the remote side needs longer to settle.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use nodevisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::new(Duration::from_millis(1000));
//!
//! assert_eq!(backoff.next(1), Duration::from_millis(1000));
//! assert_eq!(backoff.next(2), Duration::from_millis(2000));
//! assert_eq!(backoff.next(3), Duration::from_millis(3000));
//! ```

use std::time::Duration;

/// Linear retry backoff.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay unit; attempt `n` waits `base × n`.
    pub base: Duration,
}

impl BackoffPolicy {
    /// Creates a policy with the given base delay.
    pub const fn new(base: Duration) -> Self {
        Self { base }
    }

    /// Computes the delay after the given failed attempt (1-based).
    ///
    /// Saturates instead of overflowing for absurd attempt counts.
    pub fn next(&self, attempt: u32) -> Duration {
        self.base.saturating_mul(attempt.max(1))
    }
}
