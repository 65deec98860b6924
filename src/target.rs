//! Remote target identity.
//!
//! A [`Target`] names one remote host: key material reference, login user,
//! and host. It is immutable once constructed and maps to exactly one pooled
//! session via [`Target::key`] (`user@host`).
//!
//! Identity resolution itself (reading configuration, environment, wallets)
//! lives outside this crate. When resolution comes up empty the caller holds
//! `None` instead of a [`Target`], and the lifecycle layer operates in
//! degraded mode: every query answers negatively instead of erroring.

use std::path::{Path, PathBuf};

/// Identity of one remote target.
///
/// Two targets with the same `user` and `host` share a pooled session even
/// if their key paths differ; the key material only matters at session
/// spawn time.
///
/// # Example
/// ```
/// use nodevisor::Target;
///
/// let target = Target::new("/home/ops/.ssh/id_ed25519", "ops", "node-1.example.net");
/// assert_eq!(target.key(), "ops@node-1.example.net");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    key_path: PathBuf,
    user: String,
    host: String,
}

impl Target {
    /// Creates a target from its three required parts.
    pub fn new(key_path: impl Into<PathBuf>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            key_path: key_path.into(),
            user: user.into(),
            host: host.into(),
        }
    }

    /// Assembles a target from optional parts, as resolved by an external
    /// configuration source.
    ///
    /// Returns `None` if any part is missing — callers must treat that as
    /// "no connection configured", not as an error.
    ///
    /// # Example
    /// ```
    /// use nodevisor::Target;
    ///
    /// assert!(Target::from_parts(Some("/k".into()), Some("ops".into()), None).is_none());
    /// assert!(Target::from_parts(Some("/k".into()), Some("ops".into()), Some("h".into())).is_some());
    /// ```
    pub fn from_parts(
        key_path: Option<PathBuf>,
        user: Option<String>,
        host: Option<String>,
    ) -> Option<Self> {
        Some(Self {
            key_path: key_path?,
            user: user?,
            host: host?,
        })
    }

    /// Deterministic pool key: `user@host`.
    pub fn key(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Path to the private key used to open sessions.
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    /// Login user.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Remote host name or address.
    pub fn host(&self) -> &str {
        &self.host
    }
}
