use crate::git::{self, GitError};
use crate::profile::{ssh_host_alias, GITHUB_HOST};
use std::path::Path;
use thiserror::Error;

pub const ORIGIN: &str = "origin";

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Could not read the 'origin' remote: {0}")]
    NoOrigin(GitError),
    #[error("Unsupported repository URL format: {0}")]
    Unsupported(String),
    #[error("Failed to update the 'origin' remote: {0}")]
    Git(GitError),
}

/// Convert a GitHub remote URL so it goes through the profile's host alias.
///
/// Accepts `git@github.com-<other>:<path>`, `git@github.com:<path>` and
/// `https://github.com/<path>`; anything else is unsupported.
pub fn rewrite_url(url: &str, profile_name: &str) -> Result<String, RemoteError> {
    let unsupported = || RemoteError::Unsupported(url.to_string());

    let repo_path = if let Some(rest) = url.strip_prefix("git@") {
        let (host, path) = rest.split_once(':').ok_or_else(unsupported)?;
        let aliased = host
            .strip_prefix(GITHUB_HOST)
            .is_some_and(|suffix| suffix.is_empty() || suffix.starts_with('-'));
        if !aliased {
            return Err(unsupported());
        }
        path
    } else if let Some(path) = url
        .strip_prefix("https://")
        .and_then(|rest| rest.strip_prefix(GITHUB_HOST))
        .and_then(|rest| rest.strip_prefix('/'))
    {
        path
    } else {
        return Err(unsupported());
    };

    if repo_path.is_empty() {
        return Err(unsupported());
    }

    Ok(format!("git@{}:{}", ssh_host_alias(profile_name), repo_path))
}

/// Rewrite `origin` of the repository at `repo` for a profile and return the
/// new URL. Nothing is changed when the URL is unsupported.
pub fn rewrite_for_profile(repo: &Path, profile_name: &str) -> Result<String, RemoteError> {
    let current = git::remote_url(repo, ORIGIN).map_err(RemoteError::NoOrigin)?;
    let new_url = rewrite_url(&current, profile_name)?;

    if new_url != current {
        git::set_remote_url(repo, ORIGIN, &new_url).map_err(RemoteError::Git)?;
    }

    tracing::debug!(from = %current, to = %new_url, "rewrote origin");
    Ok(new_url)
}
