use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::process::Command;

/// Current version (from Cargo.toml)
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const RELEASES_URL: &str = "https://github.com/nhatpse/git-switch/releases";
const RELEASES_API: &str = "https://api.github.com/repos/nhatpse/git-switch/releases/latest";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    html_url: Option<String>,
}

/// Latest published release
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    pub version: semver::Version,
    pub url: Option<String>,
}

impl LatestRelease {
    pub fn is_newer_than(&self, current: &str) -> bool {
        semver::Version::parse(current)
            .map(|current| self.version > current)
            .unwrap_or(true)
    }
}

/// Parse the GitHub "latest release" payload
pub fn parse_release(body: &str) -> Result<LatestRelease> {
    let release: Release =
        serde_json::from_str(body).context("Unexpected response from the releases API")?;

    let tag = release.tag_name.trim();
    let tag = tag.strip_prefix('v').unwrap_or(tag);
    let version = semver::Version::parse(tag)
        .with_context(|| format!("Release tag '{}' is not a version", release.tag_name))?;

    Ok(LatestRelease {
        version,
        url: release.html_url,
    })
}

/// Fetch the latest release with curl
pub fn fetch_latest() -> Result<LatestRelease> {
    tracing::debug!("fetching {}", RELEASES_API);
    let output = Command::new("curl")
        .args([
            "-sS",
            "--max-time",
            "10",
            "-H",
            "Accept: application/vnd.github+json",
            "-H",
            "User-Agent: gitswitch",
            RELEASES_API,
        ])
        .output()
        .context("Failed to check for updates. Make sure curl is installed.")?;

    if !output.status.success() {
        bail!(
            "Failed to fetch release information: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    parse_release(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release() {
        let body = r#"{"tag_name": "v2.4.0", "html_url": "https://example.test/r/2.4.0", "name": "x"}"#;
        let release = parse_release(body).unwrap();
        assert_eq!(release.version, semver::Version::new(2, 4, 0));
        assert_eq!(release.url.as_deref(), Some("https://example.test/r/2.4.0"));
    }

    #[test]
    fn test_parse_release_rejects_garbage() {
        assert!(parse_release("{\"message\": \"Not Found\"}").is_err());
        assert!(parse_release("{\"tag_name\": \"nightly\"}").is_err());
    }

    #[test]
    fn test_version_comparison() {
        let release = parse_release(r#"{"tag_name": "0.2.0"}"#).unwrap();
        assert!(release.is_newer_than("0.1.9"));
        assert!(!release.is_newer_than("0.2.0"));
        assert!(!release.is_newer_than("1.0.0"));
    }
}
