//! Classification of failed command output.

use std::sync::LazyLock;

use regex::Regex;

static PERMISSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(permission denied|operation not permitted|are you root|must be (run as )?root|only root can|you must be root|is not in the sudoers file|a password is required)",
    )
    .expect("permission regex should be valid")
});

/// True if `text` reads like a missing-privilege failure.
pub fn is_permission_denied(text: &str) -> bool {
    PERMISSION_RE.is_match(text)
}

/// Diagnostic text to surface for a failed command: stderr, else stdout.
pub fn failure_text(stdout: &[u8], stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    if !stderr.trim().is_empty() {
        return stderr.trim_end().to_string();
    }
    String::from_utf8_lossy(stdout).trim_end().to_string()
}
