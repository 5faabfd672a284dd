//! Profile lifecycle: creation, activation and complete removal.
//!
//! Creation is ordered so that nothing is recorded for a key that was never
//! generated and nothing is activated before it is recorded. Removal runs
//! every cleanup step even when an earlier one fails, and reports each.

use crate::config::{find_by_identity, Paths, Profiles, Store, StoreError};
use crate::git::{GitError, GlobalIdentity};
use crate::profile::{Profile, ProfileError};
use crate::ssh::{self, SshConfigError};
use crate::ssh_keys::{self, FileRemoval, KeyError, KeyGenerator};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Invalid(#[from] ProfileError),
    #[error("Profile '{0}' already exists")]
    Exists(String),
    #[error("Profile '{0}' not found")]
    NotFound(String),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Failed to set Git identity: {0}")]
    Git(#[from] GitError),
    #[error("Profile '{name}' was saved but could not be activated: {source}")]
    Activate { name: String, source: GitError },
}

/// Outcome of one cleanup step
#[derive(Debug)]
pub enum Step {
    Done(String),
    Skipped(String),
    Failed(String),
}

impl Step {
    pub fn is_failed(&self) -> bool {
        matches!(self, Step::Failed(_))
    }
}

/// Result of a successful creation
#[derive(Debug)]
pub struct Created {
    pub profile: Profile,
    /// Set when the key exists but its host alias could not be written
    pub ssh_config_warning: Option<SshConfigError>,
}

/// Per-step report of a removal, in execution order
#[derive(Debug)]
pub struct Deleted {
    pub profile: Profile,
    pub git_config: Step,
    pub private_key: Step,
    pub public_key: Step,
    pub ssh_config: Step,
    pub store: Step,
}

impl Deleted {
    pub fn steps(&self) -> [&Step; 5] {
        [
            &self.git_config,
            &self.private_key,
            &self.public_key,
            &self.ssh_config,
            &self.store,
        ]
    }

    pub fn is_complete(&self) -> bool {
        !self.steps().iter().any(|s| s.is_failed())
    }
}

pub struct Manager<K, G> {
    paths: Paths,
    store: Store,
    keygen: K,
    git: G,
}

impl<K: KeyGenerator, G: GlobalIdentity> Manager<K, G> {
    pub fn new(paths: Paths, keygen: K, git: G) -> Self {
        let store = Store::new(&paths.store);
        Self {
            paths,
            store,
            keygen,
            git,
        }
    }

    pub fn paths(&self) -> &Paths {
        &self.paths
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn git(&self) -> &G {
        &self.git
    }

    pub fn profiles(&self) -> Profiles {
        self.store.load()
    }

    pub fn get(&self, name: &str) -> Result<Profile, ManagerError> {
        self.profiles()
            .remove(name)
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))
    }

    /// Profile whose identity is the active global Git identity
    pub fn active_profile(&self) -> Option<(String, Profile)> {
        let current = self.git.get_current()?;
        let profiles = self.profiles();
        find_by_identity(&profiles, &current).map(|(name, p)| (name.clone(), p.clone()))
    }

    /// Check that a new profile could be created, without side effects
    pub fn check_new(&self, name: &str, email: &str) -> Result<(), ManagerError> {
        Profile::new(name.to_string(), email.to_string(), None).validate()?;
        if self.profiles().contains_key(name) {
            return Err(ManagerError::Exists(name.to_string()));
        }
        Ok(())
    }

    /// Create a profile: generate its key, register the host alias, record
    /// it, then make it the global Git identity.
    pub fn create(&self, name: &str, email: &str, passphrase: &str) -> Result<Created, ManagerError> {
        self.check_new(name, email)?;

        let key_path = ssh_keys::generate_key(
            &self.keygen,
            &self.paths.key_path(name),
            email,
            passphrase,
        )?;
        tracing::debug!(profile = name, key = %key_path.display(), "generated key");

        let ssh_config_warning =
            ssh::append_host_alias(&self.paths.ssh_config(), name, &key_path).err();
        if let Some(ref e) = ssh_config_warning {
            tracing::warn!("{}", e);
        }

        let profile = Profile::new(name.to_string(), email.to_string(), Some(key_path));

        let mut profiles = self.profiles();
        profiles.insert(name.to_string(), profile.clone());
        self.store.save(&profiles)?;

        self.git
            .set_current(&profile.name, &profile.email)
            .map_err(|source| ManagerError::Activate {
                name: name.to_string(),
                source,
            })?;

        Ok(Created {
            profile,
            ssh_config_warning,
        })
    }

    /// Make a stored profile the global Git identity
    pub fn switch(&self, name: &str) -> Result<Profile, ManagerError> {
        let profile = self.get(name)?;
        self.git.set_current(&profile.name, &profile.email)?;
        Ok(profile)
    }

    /// Remove a profile together with its key files, host alias and, if it
    /// is active, the global Git identity.
    pub fn delete(&self, name: &str) -> Result<Deleted, ManagerError> {
        let mut profiles = self.profiles();
        let profile = profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(name.to_string()))?;

        let git_config = self.clear_if_active(&profile);

        let (private_key, public_key) = match profile.ssh_key {
            Some(ref key_path) => {
                let removal = ssh_keys::remove_key_files(key_path);
                (
                    file_step("private key", removal.private),
                    file_step("public key", removal.public),
                )
            }
            None => (
                Step::Skipped("No SSH key associated with this profile".to_string()),
                Step::Skipped("No SSH key associated with this profile".to_string()),
            ),
        };

        let ssh_config = match ssh::remove_host_alias(&self.paths.ssh_config(), name) {
            Ok(true) => Step::Done(format!("Removed SSH config entry for {}", name)),
            Ok(false) => Step::Skipped(format!("No SSH config entry for {}", name)),
            Err(e) => Step::Failed(e.to_string()),
        };

        profiles.remove(name);
        let store = match self.store.save(&profiles) {
            Ok(()) => Step::Done("Profile configuration removed".to_string()),
            Err(e) => Step::Failed(e.to_string()),
        };

        Ok(Deleted {
            profile,
            git_config,
            private_key,
            public_key,
            ssh_config,
            store,
        })
    }

    fn clear_if_active(&self, profile: &Profile) -> Step {
        let active = self
            .git
            .get_current()
            .is_some_and(|current| profile.matches(&current));

        if !active {
            return Step::Skipped(
                "Profile is not currently active, Git config left untouched".to_string(),
            );
        }

        match self.git.clear_current() {
            Ok(()) => Step::Done("Cleared global Git configuration".to_string()),
            Err(e) => Step::Failed(format!("Could not clear Git configuration: {}", e)),
        }
    }
}

fn file_step(what: &str, removal: FileRemoval) -> Step {
    match removal {
        FileRemoval::Removed(path) => Step::Done(format!("Removed {}: {}", what, path.display())),
        FileRemoval::NotFound(path) => {
            Step::Skipped(format!("{} not found: {}", capitalize(what), path.display()))
        }
        FileRemoval::Failed(path, e) => Step::Failed(format!(
            "Failed to remove {} {}: {}",
            what,
            path.display(),
            e
        )),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::tests::FakeIdentity;
    use crate::profile::public_key_path;
    use crate::ssh_keys::tests::FakeKeygen;
    use std::fs;
    use tempfile::TempDir;

    fn manager(dir: &TempDir, git: FakeIdentity) -> Manager<FakeKeygen, FakeIdentity> {
        let paths = Paths {
            store: dir.path().join("profiles.json"),
            ssh_dir: dir.path().join(".ssh"),
        };
        Manager::new(paths, FakeKeygen::default(), git)
    }

    #[test]
    fn test_create_records_and_activates() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, FakeIdentity::default());

        let created = m.create("work", "me@work.com", "").unwrap();
        assert!(created.ssh_config_warning.is_none());

        let stored = &m.profiles()["work"];
        assert_eq!(stored.name, "work");
        assert_eq!(stored.email, "me@work.com");
        let key = stored.ssh_key.as_ref().unwrap();
        assert!(key.ends_with("id_rsa_work"));
        assert!(key.exists());

        let config = fs::read_to_string(m.paths().ssh_config()).unwrap();
        assert!(config.contains("# Git profile: work\nHost github.com-work\n"));

        let current = m.git().get_current().unwrap();
        assert_eq!((current.name.as_str(), current.email.as_str()), ("work", "me@work.com"));
        assert_eq!(m.active_profile().map(|(n, _)| n).as_deref(), Some("work"));
    }

    #[test]
    fn test_duplicate_rejected_before_side_effects() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, FakeIdentity::default());
        m.create("work", "me@work.com", "").unwrap();
        m.git().clear_current().unwrap();
        let config_before = fs::read_to_string(m.paths().ssh_config()).unwrap();

        let err = m.create("work", "other@work.com", "").unwrap_err();

        assert!(matches!(err, ManagerError::Exists(ref n) if n == "work"));
        assert_eq!(m.keygen.calls.borrow().len(), 1);
        assert!(m.git().get_current().is_none());
        assert_eq!(fs::read_to_string(m.paths().ssh_config()).unwrap(), config_before);
        assert_eq!(m.profiles()["work"].email, "me@work.com");
    }

    #[test]
    fn test_invalid_input_rejected_before_side_effects() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, FakeIdentity::default());

        assert!(matches!(
            m.create("-bad", "me@work.com", ""),
            Err(ManagerError::Invalid(ProfileError::InvalidName(_)))
        ));
        assert!(matches!(
            m.create("good", "a@b", ""),
            Err(ManagerError::Invalid(ProfileError::InvalidEmail(_)))
        ));
        assert!(m.keygen.calls.borrow().is_empty());
        assert!(!m.paths().store.exists());
    }

    #[test]
    fn test_key_failure_records_nothing() {
        let dir = TempDir::new().unwrap();
        let mut m = manager(&dir, FakeIdentity::default());
        m.keygen.fail = true;

        assert!(matches!(
            m.create("work", "me@work.com", ""),
            Err(ManagerError::Key(KeyError::Keygen(_)))
        ));
        assert!(m.profiles().is_empty());
        assert!(m.git().get_current().is_none());
    }

    #[test]
    fn test_existing_key_file_aborts_creation() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, FakeIdentity::default());
        fs::create_dir_all(&m.paths().ssh_dir).unwrap();
        fs::write(m.paths().key_path("work"), "OLD").unwrap();

        assert!(matches!(
            m.create("work", "me@work.com", ""),
            Err(ManagerError::Key(KeyError::AlreadyExists(_)))
        ));
        assert!(m.profiles().is_empty());
    }

    #[test]
    fn test_activation_failure_keeps_profile() {
        let dir = TempDir::new().unwrap();
        let git = FakeIdentity {
            fail_set: true,
            ..Default::default()
        };
        let m = manager(&dir, git);

        assert!(matches!(
            m.create("work", "me@work.com", ""),
            Err(ManagerError::Activate { .. })
        ));
        assert!(m.profiles().contains_key("work"));
    }

    #[test]
    fn test_switch() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, FakeIdentity::default());
        m.create("work", "me@work.com", "").unwrap();
        m.create("home", "me@home.org", "").unwrap();

        m.switch("work").unwrap();
        assert_eq!(m.git().get_current().unwrap().email, "me@work.com");

        assert!(matches!(m.switch("nope"), Err(ManagerError::NotFound(_))));
    }

    #[test]
    fn test_delete_removes_everything_and_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, FakeIdentity::default());
        m.create("alice", "alice@example.com", "").unwrap();
        m.create("alice2", "alice2@example.com", "").unwrap();
        let key = m.paths().key_path("alice2");

        let deleted = m.delete("alice2").unwrap();

        assert!(deleted.is_complete());
        assert!(matches!(deleted.git_config, Step::Done(_)));
        assert!(matches!(deleted.private_key, Step::Done(_)));
        assert!(matches!(deleted.public_key, Step::Done(_)));
        assert!(matches!(deleted.ssh_config, Step::Done(_)));
        assert!(matches!(deleted.store, Step::Done(_)));

        assert!(!key.exists());
        assert!(!public_key_path(&key).exists());
        assert!(!m.profiles().contains_key("alice2"));
        assert!(m.git().get_current().is_none());

        let config = fs::read_to_string(m.paths().ssh_config()).unwrap();
        assert!(!config.contains("# Git profile: alice2"));
        assert!(config.contains("# Git profile: alice\n"));
        assert!(m.paths().key_path("alice").exists());

        assert!(matches!(m.delete("alice2"), Err(ManagerError::NotFound(_))));
    }

    #[test]
    fn test_delete_inactive_profile_leaves_git_config() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, FakeIdentity::default());
        m.create("work", "me@work.com", "").unwrap();
        m.create("home", "me@home.org", "").unwrap();

        let deleted = m.delete("work").unwrap();

        assert!(matches!(deleted.git_config, Step::Skipped(_)));
        assert_eq!(m.git().get_current().unwrap().name, "home");
    }

    #[test]
    fn test_delete_continues_past_missing_keys() {
        let dir = TempDir::new().unwrap();
        let m = manager(&dir, FakeIdentity::with("someone", "else@example.com"));

        let mut profiles = Profiles::new();
        profiles.insert(
            "ghost".to_string(),
            Profile::new(
                "ghost".to_string(),
                "ghost@example.com".to_string(),
                Some(m.paths().key_path("ghost")),
            ),
        );
        profiles.insert(
            "bare".to_string(),
            Profile::new("bare".to_string(), "bare@example.com".to_string(), None),
        );
        m.store().save(&profiles).unwrap();

        let deleted = m.delete("ghost").unwrap();
        assert!(matches!(deleted.private_key, Step::Skipped(_)));
        assert!(matches!(deleted.public_key, Step::Skipped(_)));
        assert!(matches!(deleted.ssh_config, Step::Skipped(_)));
        assert!(matches!(deleted.store, Step::Done(_)));
        assert!(deleted.is_complete());

        let deleted = m.delete("bare").unwrap();
        assert!(matches!(deleted.private_key, Step::Skipped(_)));
        assert!(m.profiles().is_empty());
    }
}
