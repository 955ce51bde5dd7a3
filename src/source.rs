//! Source repository URL resolution.
//!
//! The last path segment of a source URL doubles as the local cache key:
//! it is the directory name `git clone` produces, so every task that shares
//! a source URL maps onto the same working copy.

use crate::errors::SourceError;

/// Derive the stable cache key for a source repository URL.
///
/// Handles the common transport schemes:
/// - `https://gitlab.example.io/sca/srcclr/example-java-maven` → `example-java-maven`
/// - `https://github.com/acme/widget.git` → `widget`
/// - `ssh://git@host/team/repo` → `repo`
pub fn source_key(url: &str) -> Result<String, SourceError> {
    let invalid = || SourceError::InvalidUrl {
        url: url.to_string(),
    };

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .or_else(|| url.strip_prefix("ssh://"))
        .ok_or_else(invalid)?;

    let (host, path) = rest.split_once('/').ok_or_else(invalid)?;
    if host.is_empty() {
        return Err(invalid());
    }

    let segment = path
        .split('/')
        .filter(|s| !s.is_empty())
        .next_back()
        .ok_or_else(invalid)?;

    let segment = segment.strip_suffix(".git").unwrap_or(segment);
    if segment.is_empty() {
        return Err(invalid());
    }

    Ok(segment.to_string())
}
