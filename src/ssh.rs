use crate::profile::{ssh_host_alias, GITHUB_HOST};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

const MARKER_PREFIX: &str = "# Git profile: ";

#[derive(Debug, Error)]
pub enum SshConfigError {
    #[error("Failed to read SSH config {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to write SSH config {}: {source}", .path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Comment line that opens a profile's stanza
pub fn marker_line(profile_name: &str) -> String {
    format!("{}{}", MARKER_PREFIX, profile_name)
}

/// Generate the SSH Host stanza for a profile, terminated by a blank line
pub fn host_stanza(profile_name: &str, key_path: &Path) -> String {
    // ssh_config wants forward slashes even on Windows
    let identity_file = key_path.display().to_string().replace('\\', "/");

    format!(
        "{}\nHost {}\n    HostName {}\n    User git\n    IdentityFile {}\n    IdentitiesOnly yes\n\n",
        marker_line(profile_name),
        ssh_host_alias(profile_name),
        GITHUB_HOST,
        identity_file
    )
}

/// Scanner state while filtering a config file line by line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Copying,
    Skipping,
}

/// Drop the first stanza opened by the exact marker for `profile_name`.
///
/// The stanza runs from the marker line through the next blank line, the
/// next profile marker, or the end of the input. Returns the new content and whether a stanza was
/// found.
pub fn strip_stanza(content: &str, profile_name: &str) -> (String, bool) {
    let marker = marker_line(profile_name);
    let mut state = Scan::Copying;
    let mut removed = false;
    let mut kept = String::with_capacity(content.len());

    for line in content.split_inclusive('\n') {
        let text = line.trim_end_matches(&['\r', '\n'][..]);
        match state {
            Scan::Copying if !removed && text.trim_end() == marker => {
                state = Scan::Skipping;
                removed = true;
            }
            Scan::Copying => kept.push_str(line),
            Scan::Skipping if text.trim().is_empty() => state = Scan::Copying,
            Scan::Skipping if text.starts_with(MARKER_PREFIX) => {
                state = Scan::Copying;
                kept.push_str(line);
            }
            Scan::Skipping => {}
        }
    }

    (kept, removed)
}

fn read_config(path: &Path) -> Result<String, SshConfigError> {
    if !path.exists() {
        return Ok(String::new());
    }
    fs::read_to_string(path).map_err(|source| SshConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn write_config(path: &Path, content: &str) -> Result<(), SshConfigError> {
    let write_err = |source: io::Error| SshConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, content).map_err(write_err)
}

/// Append a profile's host alias to the SSH config, creating the file if
/// needed. Any stanza already present for the same profile is replaced, so
/// calling this twice leaves exactly one stanza.
pub fn append_host_alias(
    config_path: &Path,
    profile_name: &str,
    key_path: &Path,
) -> Result<(), SshConfigError> {
    let mut content = read_config(config_path)?;

    loop {
        let (stripped, removed) = strip_stanza(&content, profile_name);
        content = stripped;
        if !removed {
            break;
        }
    }

    // Keep a blank line between the previous entry and the new marker
    if !content.is_empty() {
        if !content.ends_with('\n') {
            content.push('\n');
        }
        if !content.ends_with("\n\n") {
            content.push('\n');
        }
    }
    content.push_str(&host_stanza(profile_name, key_path));

    write_config(config_path, &content)?;
    tracing::debug!(profile = profile_name, path = %config_path.display(), "wrote host alias");
    Ok(())
}

/// Remove a profile's stanza from the SSH config.
///
/// Missing config file is a no-op. Returns whether a stanza was removed.
pub fn remove_host_alias(config_path: &Path, profile_name: &str) -> Result<bool, SshConfigError> {
    if !config_path.exists() {
        return Ok(false);
    }

    let content = read_config(config_path)?;
    let (stripped, removed) = strip_stanza(&content, profile_name);
    if removed {
        write_config(config_path, &stripped)?;
    }
    Ok(removed)
}

/// Make sure GitHub's host key is in known_hosts.
///
/// Best effort: any failure is logged and ignored.
pub fn ensure_known_host(known_hosts: &Path) {
    if let Err(e) = try_ensure_known_host(known_hosts) {
        tracing::debug!("could not seed known_hosts: {}", e);
    }
}

fn try_ensure_known_host(known_hosts: &Path) -> io::Result<()> {
    if known_hosts.exists() && fs::read_to_string(known_hosts)?.contains(GITHUB_HOST) {
        return Ok(());
    }

    tracing::debug!("running ssh-keyscan for {}", GITHUB_HOST);
    let output = Command::new("ssh-keyscan")
        .args(["-t", "rsa", GITHUB_HOST])
        .output()?;

    if !output.status.success() || output.stdout.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            "ssh-keyscan returned no host key",
        ));
    }

    if let Some(parent) = known_hosts.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(known_hosts)?;
    file.write_all(&output.stdout)
}
