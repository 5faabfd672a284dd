use crate::profile::public_key_path;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// RSA key size requested from ssh-keygen
const KEY_BITS: &str = "4096";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("SSH key already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
    #[error("Failed to run ssh-keygen. Is OpenSSH installed? ({0})")]
    Spawn(io::Error),
    #[error("ssh-keygen failed: {0}")]
    Keygen(String),
    #[error("I/O error on SSH key {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

/// Parameters for one key pair
#[derive(Debug, Clone)]
pub struct KeyRequest<'a> {
    pub path: &'a Path,
    pub email: &'a str,
    pub passphrase: &'a str,
}

/// Something that can write a key pair to `request.path` and `request.path.pub`
pub trait KeyGenerator {
    fn generate(&self, request: &KeyRequest<'_>) -> Result<(), KeyError>;
}

/// Key generation through the OpenSSH `ssh-keygen` binary
#[derive(Debug, Default, Clone, Copy)]
pub struct SshKeygen;

impl KeyGenerator for SshKeygen {
    fn generate(&self, request: &KeyRequest<'_>) -> Result<(), KeyError> {
        tracing::debug!(path = %request.path.display(), "running ssh-keygen");

        let output = Command::new("ssh-keygen")
            .args(["-t", "rsa", "-b", KEY_BITS, "-C", request.email, "-f"])
            .arg(request.path)
            .args(["-N", request.passphrase])
            .output()
            .map_err(KeyError::Spawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(KeyError::Keygen(stderr));
        }

        Ok(())
    }
}

/// Generate the key pair for a profile at `key_path`.
///
/// Refuses to overwrite an existing key. On success the private key is
/// restricted to its owner (on unix).
pub fn generate_key(
    generator: &impl KeyGenerator,
    key_path: &Path,
    email: &str,
    passphrase: &str,
) -> Result<PathBuf, KeyError> {
    if key_path.exists() {
        return Err(KeyError::AlreadyExists(key_path.to_path_buf()));
    }

    if let Some(ssh_dir) = key_path.parent() {
        ensure_ssh_dir(ssh_dir)?;
    }

    generator.generate(&KeyRequest {
        path: key_path,
        email,
        passphrase,
    })?;

    set_key_permissions(key_path)?;

    Ok(key_path.to_path_buf())
}

/// Create the SSH directory if it is missing and restrict it to the owner
pub fn ensure_ssh_dir(ssh_dir: &Path) -> Result<(), KeyError> {
    fs::create_dir_all(ssh_dir).map_err(|source| KeyError::Io {
        path: ssh_dir.to_path_buf(),
        source,
    })?;
    restrict_ssh_dir(ssh_dir)
}

/// Set mode 0700 on an existing SSH directory (unix only)
pub fn restrict_ssh_dir(ssh_dir: &Path) -> Result<(), KeyError> {
    if !ssh_dir.is_dir() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(ssh_dir, fs::Permissions::from_mode(0o700)).map_err(|source| {
            KeyError::Io {
                path: ssh_dir.to_path_buf(),
                source,
            }
        })?;
    }

    Ok(())
}

#[cfg(unix)]
fn set_key_permissions(key_path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let public = public_key_path(key_path);
    for (path, mode) in [(key_path.to_path_buf(), 0o600), (public, 0o644)] {
        if path.exists() {
            fs::set_permissions(&path, fs::Permissions::from_mode(mode))
                .map_err(|source| KeyError::Io { path, source })?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_key_permissions(_key_path: &Path) -> Result<(), KeyError> {
    Ok(())
}

/// Get the public key content (for display/copying)
pub fn read_public_key(key_path: &Path) -> Result<String, KeyError> {
    let path = public_key_path(key_path);
    fs::read_to_string(&path)
        .map(|content| content.trim().to_string())
        .map_err(|source| KeyError::Io { path, source })
}

/// What happened to one key file during removal
#[derive(Debug)]
pub enum FileRemoval {
    Removed(PathBuf),
    NotFound(PathBuf),
    Failed(PathBuf, io::Error),
}

/// Removal outcome for both halves of a key pair
#[derive(Debug)]
pub struct KeyRemoval {
    pub private: FileRemoval,
    pub public: FileRemoval,
}

/// Delete the private and public key files independently of each other
pub fn remove_key_files(key_path: &Path) -> KeyRemoval {
    KeyRemoval {
        private: remove_file(key_path.to_path_buf()),
        public: remove_file(public_key_path(key_path)),
    }
}

fn remove_file(path: PathBuf) -> FileRemoval {
    if !path.exists() {
        return FileRemoval::NotFound(path);
    }
    match fs::remove_file(&path) {
        Ok(()) => FileRemoval::Removed(path),
        Err(e) => FileRemoval::Failed(path, e),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Writes placeholder key files instead of running ssh-keygen
    #[derive(Default)]
    pub(crate) struct FakeKeygen {
        pub calls: RefCell<Vec<PathBuf>>,
        pub fail: bool,
    }

    impl KeyGenerator for FakeKeygen {
        fn generate(&self, request: &KeyRequest<'_>) -> Result<(), KeyError> {
            self.calls.borrow_mut().push(request.path.to_path_buf());
            if self.fail {
                return Err(KeyError::Keygen("boom".to_string()));
            }
            fs::write(request.path, "PRIVATE").unwrap();
            fs::write(
                public_key_path(request.path),
                format!("ssh-rsa AAAA {}\n", request.email),
            )
            .unwrap();
            Ok(())
        }
    }

    #[test]
    fn test_generate_key_writes_pair() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join(".ssh").join("id_rsa_work");
        let keygen = FakeKeygen::default();

        let path = generate_key(&keygen, &key_path, "me@work.com", "").unwrap();

        assert_eq!(path, key_path);
        assert!(key_path.exists());
        assert_eq!(read_public_key(&key_path).unwrap(), "ssh-rsa AAAA me@work.com");
    }

    #[cfg(unix)]
    #[test]
    fn test_generate_key_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let ssh_dir = dir.path().join(".ssh");
        let key_path = ssh_dir.join("id_rsa_work");

        generate_key(&FakeKeygen::default(), &key_path, "me@work.com", "").unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&ssh_dir), 0o700);
        assert_eq!(mode(&key_path), 0o600);
        assert_eq!(mode(&public_key_path(&key_path)), 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn test_restrict_existing_ssh_dir() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let ssh_dir = dir.path().join(".ssh");
        fs::create_dir(&ssh_dir).unwrap();
        fs::set_permissions(&ssh_dir, fs::Permissions::from_mode(0o755)).unwrap();

        restrict_ssh_dir(&ssh_dir).unwrap();

        let mode = fs::metadata(&ssh_dir).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o700);
    }

    #[test]
    fn test_restrict_missing_ssh_dir_is_noop() {
        let dir = TempDir::new().unwrap();
        let ssh_dir = dir.path().join("absent");
        restrict_ssh_dir(&ssh_dir).unwrap();
        assert!(!ssh_dir.exists());
    }

    #[test]
    fn test_existing_key_is_not_regenerated() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("id_rsa_work");
        fs::write(&key_path, "OLD").unwrap();
        let keygen = FakeKeygen::default();

        let result = generate_key(&keygen, &key_path, "me@work.com", "");

        assert!(matches!(result, Err(KeyError::AlreadyExists(_))));
        assert!(keygen.calls.borrow().is_empty());
        assert_eq!(fs::read_to_string(&key_path).unwrap(), "OLD");
    }

    #[test]
    fn test_keygen_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let keygen = FakeKeygen {
            fail: true,
            ..Default::default()
        };

        let result = generate_key(&keygen, &dir.path().join("id_rsa_x"), "x@y.com", "");
        assert!(matches!(result, Err(KeyError::Keygen(msg)) if msg == "boom"));
    }

    #[test]
    fn test_remove_key_files() {
        let dir = TempDir::new().unwrap();
        let key_path = dir.path().join("id_rsa_work");
        fs::write(&key_path, "PRIVATE").unwrap();

        let removal = remove_key_files(&key_path);
        assert!(matches!(removal.private, FileRemoval::Removed(_)));
        assert!(matches!(removal.public, FileRemoval::NotFound(_)));
        assert!(!key_path.exists());

        let again = remove_key_files(&key_path);
        assert!(matches!(again.private, FileRemoval::NotFound(_)));
    }
}
