use crate::profile::Identity;
use std::io;
use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to execute git. Is it installed? ({0})")]
    Spawn(#[from] io::Error),
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
}

/// The global `user.name` / `user.email` pair
pub trait GlobalIdentity {
    /// Current identity, or None if either key is unset
    fn get_current(&self) -> Option<Identity>;
    fn set_current(&self, name: &str, email: &str) -> Result<(), GitError>;
    fn clear_current(&self) -> Result<(), GitError>;
}

/// Global identity backed by the `git` binary
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GlobalIdentity for GitCli {
    fn get_current(&self) -> Option<Identity> {
        let name = get_global("user.name").ok()??;
        let email = get_global("user.email").ok()??;
        Some(Identity { name, email })
    }

    fn set_current(&self, name: &str, email: &str) -> Result<(), GitError> {
        set_global("user.name", name)?;
        set_global("user.email", email)
    }

    fn clear_current(&self) -> Result<(), GitError> {
        // Attempt both so a missing name doesn't leave the email behind
        let name = unset_global("user.name");
        let email = unset_global("user.email");
        name.and(email)
    }
}

fn git(args: &[&str]) -> Result<Output, GitError> {
    tracing::debug!("git {}", args.join(" "));
    Ok(Command::new("git").args(args).output()?)
}

fn git_in(repo: &Path, args: &[&str]) -> Result<Output, GitError> {
    tracing::debug!("git -C {} {}", repo.display(), args.join(" "));
    Ok(Command::new("git").current_dir(repo).args(args).output()?)
}

fn check(args: &[&str], output: Output) -> Result<Output, GitError> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(GitError::Failed {
            command: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

fn stdout_value(output: &Output) -> Option<String> {
    let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Get a global git config value; Ok(None) when unset
pub fn get_global(key: &str) -> Result<Option<String>, GitError> {
    let output = git(&["config", "--global", "--get", key])?;
    if output.status.success() {
        Ok(stdout_value(&output))
    } else {
        Ok(None)
    }
}

/// Set a global git config value
pub fn set_global(key: &str, value: &str) -> Result<(), GitError> {
    let args = ["config", "--global", key, value];
    check(&args, git(&args)?)?;
    Ok(())
}

/// Unset a global git config value
pub fn unset_global(key: &str) -> Result<(), GitError> {
    let args = ["config", "--global", "--unset", key];
    check(&args, git(&args)?)?;
    Ok(())
}

/// Check if `dir` is inside a git repository
pub fn is_git_repo(dir: &Path) -> bool {
    git_in(dir, &["rev-parse", "--git-dir"])
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Get the URL of a remote
pub fn remote_url(repo: &Path, remote: &str) -> Result<String, GitError> {
    let args = ["remote", "get-url", remote];
    let output = check(&args, git_in(repo, &args)?)?;
    stdout_value(&output).ok_or_else(|| GitError::Failed {
        command: args.join(" "),
        stderr: "empty remote URL".to_string(),
    })
}

/// Point a remote at a new URL
pub fn set_remote_url(repo: &Path, remote: &str, url: &str) -> Result<(), GitError> {
    let args = ["remote", "set-url", remote, url];
    check(&args, git_in(repo, &args)?)?;
    Ok(())
}
