//! Privilege-escalation detection and non-interactive rewriting.
//!
//! A privileged command run over a prompt-less channel must never wait for a
//! password: `sudo -n` makes a missing-credential situation fail immediately
//! with a clear error instead of hanging until the command times out.

/// The non-interactive escalation prefix commands are rewritten to.
const SUDO_NONINTERACTIVE: &str = "sudo -n ";

/// Returns whether the command text invokes privilege escalation.
///
/// # Example
/// ```
/// use nodevisor::requires_sudo;
///
/// assert!(requires_sudo("sudo systemctl stop noded"));
/// assert!(requires_sudo("sudo -n systemctl stop noded"));
/// assert!(!requires_sudo("systemctl is-active noded"));
/// ```
pub fn requires_sudo(command: &str) -> bool {
    let trimmed = command.trim_start();
    trimmed == "sudo" || trimmed.starts_with("sudo ")
}

/// Rewrites a command to request non-interactive privilege escalation.
///
/// - `sudo …` becomes `sudo -n …`
/// - a command with no escalation prefix gets one prepended
/// - an already-rewritten command is returned unchanged (idempotent)
///
/// # Example
/// ```
/// use nodevisor::rewrite_noninteractive;
///
/// let once = rewrite_noninteractive("sudo systemctl stop noded");
/// assert_eq!(once, "sudo -n systemctl stop noded");
/// assert_eq!(rewrite_noninteractive(&once), once);
/// ```
pub fn rewrite_noninteractive(command: &str) -> String {
    let trimmed = command.trim_start();
    if trimmed.starts_with(SUDO_NONINTERACTIVE) {
        return trimmed.to_string();
    }
    if let Some(rest) = trimmed.strip_prefix("sudo ") {
        return format!("{SUDO_NONINTERACTIVE}{rest}");
    }
    format!("{SUDO_NONINTERACTIVE}{trimmed}")
}
