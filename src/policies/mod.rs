//! Retry and privilege-escalation policies.
//!
//! - [`BackoffPolicy`] — how long to wait between retry attempts.
//! - [`requires_sudo`] / [`rewrite_noninteractive`] — detection and
//!   idempotent rewriting of privileged commands so a missing password
//!   fails fast instead of hanging on a prompt.

mod backoff;
mod sudo;

pub use backoff::BackoffPolicy;
pub use sudo::{requires_sudo, rewrite_noninteractive};
