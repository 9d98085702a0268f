//! Filesystem path guard
//!
//! Allow/deny policy over normalized paths. Blocked entries match either as a
//! prefix of the normalized path or as a substring anywhere inside it; the
//! substring rule also catches sensitive directory names reached through
//! symlinks or relative segments, trading occasional over-blocking for never
//! letting `.ssh` and friends slip through mid-path.

use thiserror::Error;

/// Denial verdict carrying the human-readable reason
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct PathBlocked {
    pub reason: String,
}

/// Directories no agent action may touch, regardless of configuration source.
/// OS system directories plus user credential stores.
pub fn default_blocked_dirs() -> Vec<String> {
    [
        "/etc",
        "/proc",
        "/sys",
        // Catches unix /boot and any drive's x:/boot via the substring rule
        "/boot",
        // Unanchored on purpose: system directories live on any drive letter
        "system32",
        "syswow64",
        ".ssh",
        ".gnupg",
        ".aws",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Immutable path policy, constructed once per session.
pub struct DirectoryGuard {
    blocked: Vec<String>,
    allowed: Vec<String>,
}

impl Default for DirectoryGuard {
    fn default() -> Self {
        Self::new(default_blocked_dirs(), Vec::new())
    }
}

impl DirectoryGuard {
    /// Build a guard from rule lists. Rules are normalized here so checks can
    /// compare them to normalized query paths directly.
    pub fn new(blocked: Vec<String>, allowed: Vec<String>) -> Self {
        Self {
            blocked: blocked.iter().map(|r| normalize_rule(r)).collect(),
            allowed: allowed.iter().map(|r| normalize_rule(r)).collect(),
        }
    }

    /// Check whether a path may be touched.
    ///
    /// When an allow-list is configured, the path must live under one of its
    /// entries; the blocked list is applied afterwards either way, so an
    /// allow-list can never open up a credential directory.
    pub fn check(&self, path: &str) -> Result<(), PathBlocked> {
        let normalized = normalize_path(path);

        if !self.allowed.is_empty()
            && !self.allowed.iter().any(|dir| normalized.starts_with(dir.as_str()))
        {
            tracing::warn!(path = %normalized, "path outside allowed directories");
            return Err(PathBlocked {
                reason: "not in allowed directories".to_string(),
            });
        }

        for dir in &self.blocked {
            if normalized.starts_with(dir.as_str()) || normalized.contains(dir.as_str()) {
                tracing::warn!(path = %normalized, rule = %dir, "path blocked");
                return Err(PathBlocked {
                    reason: format!("blocked directory: {}", dir),
                });
            }
        }

        tracing::debug!(path = %normalized, "path allowed");
        Ok(())
    }
}

/// Rule normalization: case fold, forward slashes, no trailing separator.
/// Rules stay as written otherwise, so a bare `.ssh` keeps its substring
/// semantics instead of being anchored to the current directory.
fn normalize_rule(rule: &str) -> String {
    rule.trim()
        .replace('\\', "/")
        .to_lowercase()
        .trim_end_matches('/')
        .to_string()
}

/// Query normalization: same folding as rules, plus resolution of relative
/// inputs against the process working directory so prefix comparison is
/// always absolute-to-absolute.
fn normalize_path(path: &str) -> String {
    let folded = path.trim().replace('\\', "/").to_lowercase();

    let is_absolute = folded.starts_with('/')
        || (folded.len() >= 2 && folded.as_bytes()[1] == b':');
    if is_absolute {
        return folded;
    }

    match std::env::current_dir() {
        Ok(cwd) => {
            let base = cwd.to_string_lossy().replace('\\', "/").to_lowercase();
            format!("{}/{}", base.trim_end_matches('/'), folded)
        }
        Err(_) => folded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_directories_blocked_by_default() {
        let guard = DirectoryGuard::default();
        assert!(guard.check("/etc/passwd").is_err());
        assert!(guard.check("/proc/1/maps").is_err());
        assert!(guard.check("/sys/kernel").is_err());
        assert!(guard.check("/boot/grub").is_err());
    }

    #[test]
    fn test_ordinary_user_path_allowed() {
        let guard = DirectoryGuard::default();
        assert!(guard.check("/home/user/project/file.txt").is_ok());
        assert!(guard.check("/tmp/scratch.log").is_ok());
    }

    #[test]
    fn test_credential_directories_blocked_mid_path() {
        let guard = DirectoryGuard::default();
        // Substring rule: .ssh anywhere in the path is enough
        assert!(guard.check("/home/user/.ssh/id_rsa").is_err());
        assert!(guard.check("/mnt/backup/home/.gnupg/secring.gpg").is_err());
        assert!(guard.check("/home/user/.aws/credentials").is_err());
    }

    #[test]
    fn test_windows_paths_case_folded() {
        let guard = DirectoryGuard::default();
        assert!(guard.check(r"C:\Windows\System32\cmd.exe").is_err());
        assert!(guard.check(r"c:\windows\syswow64\kernel32.dll").is_err());
        assert!(guard.check(r"C:\Users\user\notes.txt").is_ok());
    }

    #[test]
    fn test_system_directories_blocked_on_any_drive() {
        let guard = DirectoryGuard::default();
        assert!(guard.check(r"D:\Windows\System32\drivers\etc\hosts").is_err());
        assert!(guard.check(r"E:\Boot\BCD").is_err());
    }

    #[test]
    fn test_allowlist_blocks_everything_else() {
        let guard = DirectoryGuard::new(
            default_blocked_dirs(),
            vec!["/home/user/project".to_string()],
        );
        assert!(guard.check("/home/user/project/src/main.rs").is_ok());

        let err = guard.check("/tmp/x").unwrap_err();
        assert_eq!(err.reason, "not in allowed directories");
    }

    #[test]
    fn test_blocklist_applies_inside_allowlist() {
        let guard = DirectoryGuard::new(
            default_blocked_dirs(),
            vec!["/home/user".to_string()],
        );
        assert!(guard.check("/home/user/docs/report.md").is_ok());
        assert!(guard.check("/home/user/.ssh/config").is_err());
    }

    #[test]
    fn test_blocked_reason_names_rule() {
        let guard = DirectoryGuard::default();
        let err = guard.check("/etc/shadow").unwrap_err();
        assert_eq!(err.reason, "blocked directory: /etc");
    }

    #[test]
    fn test_relative_path_resolved_against_cwd() {
        let guard = DirectoryGuard::new(vec![], vec!["/definitely/not/here".to_string()]);
        // Relative input becomes absolute, so the allow-list check is meaningful
        assert!(guard.check("notes.txt").is_err());
    }
}
