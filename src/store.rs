//! Store - durable records keyed by name. The only shared state in the vault.
//!
//! Two records live here per installation scope:
//!
//! | Key | Contents |
//! |-----|----------|
//! | `mnemonic.json` | plain or sealed mnemonic record |
//! | `index-<fingerprint>.json` | next unused account index |

use crate::error::{VaultError, VaultResult};
use std::collections::HashMap;
use std::sync::RwLock;

#[cfg(feature = "native")]
use std::path::{Path, PathBuf};

/// Durable key/value persistence. `save` must be all-or-nothing.
pub trait SecretStore: Send + Sync {
    fn load(&self, key: &str) -> VaultResult<Option<Vec<u8>>>;
    fn save(&self, key: &str, bytes: &[u8]) -> VaultResult<()>;

    fn exists(&self, key: &str) -> VaultResult<bool> {
        Ok(self.load(key)?.is_some())
    }
}

/// In-memory store for tests and embedders that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }
}

impl SecretStore for MemoryStore {
    fn load(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        let records = self
            .records
            .read()
            .map_err(|_| VaultError::Persistence("store lock".into()))?;
        Ok(records.get(key).cloned())
    }

    fn save(&self, key: &str, bytes: &[u8]) -> VaultResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| VaultError::Persistence("store lock".into()))?;
        records.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// One file per key. Writes go to a temp file, are fsynced, then renamed over the target.
#[cfg(feature = "native")]
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

#[cfg(feature = "native")]
impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> VaultResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| VaultError::Persistence(format!("mkdir {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    fn path_for(&self, key: &str) -> VaultResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(VaultError::Persistence(format!("invalid store key: {key:?}")));
        }
        Ok(self.dir.join(key))
    }
}

#[cfg(feature = "native")]
impl SecretStore for FileStore {
    fn load(&self, key: &str) -> VaultResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::Persistence(format!("read {}: {e}", path.display()))),
        }
    }

    fn save(&self, key: &str, bytes: &[u8]) -> VaultResult<()> {
        use std::io::Write;

        let path = self.path_for(key)?;
        let tmp = self.dir.join(format!(".{key}.tmp"));

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options
            .open(&tmp)
            .map_err(|e| VaultError::Persistence(format!("open {}: {e}", tmp.display())))?;
        file.write_all(bytes)
            .and_then(|_| file.sync_all())
            .map_err(|e| VaultError::Persistence(format!("write {}: {e}", tmp.display())))?;
        drop(file);

        std::fs::rename(&tmp, &path)
            .map_err(|e| VaultError::Persistence(format!("rename {}: {e}", path.display())))?;

        // Directory fsync makes the rename itself durable.
        #[cfg(unix)]
        {
            if let Ok(dir) = std::fs::File::open(&self.dir) {
                let _ = dir.sync_all();
            }
        }

        tracing::debug!(key, bytes = bytes.len(), "store record saved");
        Ok(())
    }

    fn exists(&self, key: &str) -> VaultResult<bool> {
        Ok(self.path_for(key)?.exists())
    }
}
