//! Source revision probing via `git`.
//!
//! Both probes answer `None` when the directory is not inside a work tree
//! or `git` is unavailable; callers fall back to [`FALLBACK_TAG`].

use std::path::Path;
use std::process::Command;

/// Image tag used when no source revision can be determined.
pub const FALLBACK_TAG: &str = "latest";

/// Revision metadata of the source tree, as handed to the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRevision {
    pub short_hash: String,
    /// `None` when the work tree state could not be read.
    pub dirty: Option<bool>,
}

impl SourceRevision {
    pub fn new(short_hash: impl Into<String>, dirty: Option<bool>) -> Self {
        Self {
            short_hash: short_hash.into(),
            dirty,
        }
    }
}

/// Short hash of `HEAD` plus the work tree state, or `None` outside a work tree.
pub fn probe(dir: &Path) -> Option<SourceRevision> {
    let short_hash = short_hash(dir)?;
    Some(SourceRevision {
        short_hash,
        dirty: is_dirty(dir),
    })
}

/// Short hash of `HEAD` in `dir`.
pub fn short_hash(dir: &Path) -> Option<String> {
    let output = git(dir, &["rev-parse", "--short", "HEAD"])?;
    let hash = output.trim();
    if hash.is_empty() {
        None
    } else {
        Some(hash.to_owned())
    }
}

/// Whether the work tree at `dir` has uncommitted changes.
pub fn is_dirty(dir: &Path) -> Option<bool> {
    git(dir, &["status", "--porcelain"]).map(|out| !out.trim().is_empty())
}

fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = match Command::new("git").args(args).current_dir(dir).output() {
        Ok(output) => output,
        Err(e) => {
            tracing::debug!(error = %e, "git unavailable");
            return None;
        }
    };

    if !output.status.success() {
        tracing::debug!(
            status = %output.status,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "git {} failed",
            args.join(" "),
        );
        return None;
    }

    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_directory_has_no_revision() {
        let dir = Path::new("/nonexistent/liftoff/source");
        assert_eq!(short_hash(dir), None);
        assert_eq!(is_dirty(dir), None);
        assert_eq!(probe(dir), None);
    }
}
