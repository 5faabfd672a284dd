use crate::profile::{Identity, Profile};
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Store file name, relative to the home directory
const STORE_FILE_NAME: &str = ".git_profiles.json";

/// Profiles keyed by profile name
pub type Profiles = BTreeMap<String, Profile>;

/// Filesystem locations the tool reads and writes
#[derive(Debug, Clone)]
pub struct Paths {
    pub store: PathBuf,
    pub ssh_dir: PathBuf,
}

impl Paths {
    /// Resolve locations, falling back to `~/.git_profiles.json` and `~/.ssh`
    pub fn resolve(store: Option<PathBuf>, ssh_dir: Option<PathBuf>) -> Result<Self> {
        let home = || dirs::home_dir().context("Could not determine home directory");

        let store = match store {
            Some(path) => path,
            None => home()?.join(STORE_FILE_NAME),
        };
        let ssh_dir = match ssh_dir {
            Some(path) => path,
            None => home()?.join(".ssh"),
        };

        Ok(Self { store, ssh_dir })
    }

    pub fn ssh_config(&self) -> PathBuf {
        self.ssh_dir.join("config")
    }

    pub fn known_hosts(&self) -> PathBuf {
        self.ssh_dir.join("known_hosts")
    }

    /// Deterministic private key location for a profile
    pub fn key_path(&self, profile_name: &str) -> PathBuf {
        self.ssh_dir.join(format!("id_rsa_{}", profile_name))
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read profile store {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("Failed to parse profile store {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to write profile store {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to serialize profiles: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// JSON file mapping profile names to profiles
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all profiles. A missing, empty or corrupt file yields an empty
    /// mapping; corruption is logged as a warning.
    pub fn load(&self) -> Profiles {
        match self.try_load() {
            Ok(profiles) => profiles,
            Err(e) => {
                tracing::warn!("{}", e);
                Profiles::new()
            }
        }
    }

    pub fn try_load(&self) -> Result<Profiles, StoreError> {
        if !self.path.exists() {
            return Ok(Profiles::new());
        }

        let content = fs::read_to_string(&self.path).map_err(|source| StoreError::Read {
            path: self.path.clone(),
            source,
        })?;

        if content.trim().is_empty() {
            return Ok(Profiles::new());
        }

        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Overwrite the store with the full mapping
    pub fn save(&self, profiles: &Profiles) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        let content = serde_json::to_string_pretty(profiles)?;
        fs::write(&self.path, content).map_err(write_err)?;

        tracing::debug!(path = %self.path.display(), count = profiles.len(), "saved profiles");
        Ok(())
    }
}

/// Find the profile whose identity equals the given one
pub fn find_by_identity<'a>(
    profiles: &'a Profiles,
    identity: &Identity,
) -> Option<(&'a String, &'a Profile)> {
    profiles
        .iter()
        .find(|(_, profile)| profile.matches(identity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn profile(name: &str, key: Option<&str>) -> Profile {
        Profile::new(
            name.to_string(),
            format!("{}@example.com", name),
            key.map(PathBuf::from),
        )
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("profiles.json"));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_creates_parent_dirs_and_loads_back() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path().join("nested").join("profiles.json"));

        let mut profiles = Profiles::new();
        profiles.insert("work".to_string(), profile("work", Some("/k/id_rsa_work")));
        profiles.insert("home".to_string(), profile("home", None));
        store.save(&profiles).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, profiles);
        assert_eq!(loaded["home"].ssh_key, None);
    }

    #[test]
    fn test_json_layout() {
        let mut profiles = Profiles::new();
        profiles.insert("work".to_string(), profile("work", Some("/k/id_rsa_work")));
        profiles.insert("home".to_string(), profile("home", None));

        let json = serde_json::to_value(&profiles).unwrap();
        assert_eq!(json["work"]["name"], "work");
        assert_eq!(json["work"]["email"], "work@example.com");
        assert_eq!(json["work"]["ssh_key"], "/k/id_rsa_work");
        assert!(json["home"].get("ssh_key").is_none());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiles.json");
        fs::write(&path, "{ not json").unwrap();

        let store = Store::new(&path);
        assert!(matches!(store.try_load(), Err(StoreError::Parse { .. })));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_empty_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("profiles.json");
        fs::write(&path, "  \n").unwrap();

        assert!(Store::new(&path).try_load().unwrap().is_empty());
    }

    #[test]
    fn test_find_by_identity() {
        let mut profiles = Profiles::new();
        profiles.insert("work".to_string(), profile("work", None));

        let hit = Identity {
            name: "work".to_string(),
            email: "work@example.com".to_string(),
        };
        let miss = Identity {
            name: "work".to_string(),
            email: "other@example.com".to_string(),
        };

        assert_eq!(find_by_identity(&profiles, &hit).map(|(n, _)| n.as_str()), Some("work"));
        assert!(find_by_identity(&profiles, &miss).is_none());
    }

    #[test]
    fn test_key_path() {
        let paths = Paths::resolve(Some(PathBuf::from("/s.json")), Some(PathBuf::from("/h/.ssh")))
            .unwrap();
        assert_eq!(paths.key_path("work"), PathBuf::from("/h/.ssh/id_rsa_work"));
        assert_eq!(paths.ssh_config(), PathBuf::from("/h/.ssh/config"));
    }
}
