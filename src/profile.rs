use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Host every profile authenticates against
pub const GITHUB_HOST: &str = "github.com";

/// Longest name GitHub accepts for an account
pub const MAX_NAME_LENGTH: usize = 39;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,
}

/// A `user.name` / `user.email` pair as Git sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("Profile name cannot be empty")]
    EmptyName,
    #[error("Profile name is too long (max {} characters)", MAX_NAME_LENGTH)]
    NameTooLong,
    #[error("Invalid profile name '{0}': use letters, digits and inner hyphens only")]
    InvalidName(String),
    #[error("Email cannot be empty")]
    EmptyEmail,
    #[error("Invalid email address '{0}'")]
    InvalidEmail(String),
}

impl Profile {
    pub fn new(name: String, email: String, ssh_key: Option<PathBuf>) -> Self {
        Self {
            name,
            email,
            ssh_key,
        }
    }

    pub fn validate(&self) -> Result<(), ProfileError> {
        validate_name(&self.name)?;
        validate_email(&self.email)
    }

    pub fn matches(&self, identity: &Identity) -> bool {
        self.name == identity.name && self.email == identity.email
    }

    pub fn public_key_path(&self) -> Option<PathBuf> {
        self.ssh_key.as_deref().map(public_key_path)
    }
}

/// SSH host alias routing to GitHub with this profile's key (e.g. "github.com-work")
pub fn ssh_host_alias(profile_name: &str) -> String {
    format!("{}-{}", GITHUB_HOST, profile_name)
}

/// Public half of a key pair lives next to the private key
pub fn public_key_path(private_key: &Path) -> PathBuf {
    let mut path = private_key.as_os_str().to_owned();
    path.push(".pub");
    PathBuf::from(path)
}

/// Validate a profile name against GitHub's username grammar:
/// alphanumerics with inner hyphens, no leading or trailing hyphen.
pub fn validate_name(name: &str) -> Result<(), ProfileError> {
    if name.is_empty() {
        return Err(ProfileError::EmptyName);
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ProfileError::NameTooLong);
    }

    let valid_chars = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !valid_chars || name.starts_with('-') || name.ends_with('-') {
        return Err(ProfileError::InvalidName(name.to_string()));
    }

    Ok(())
}

/// Validate an email of the shape `local@domain.tld`
pub fn validate_email(email: &str) -> Result<(), ProfileError> {
    if email.is_empty() {
        return Err(ProfileError::EmptyEmail);
    }

    let invalid = || ProfileError::InvalidEmail(email.to_string());

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;

    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    if !local_ok {
        return Err(invalid());
    }

    // The TLD is whatever follows the last dot; everything before it may
    // itself contain dots and hyphens.
    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;

    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());

    if host_ok && tld_ok {
        Ok(())
    } else {
        Err(invalid())
    }
}
