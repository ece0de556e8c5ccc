//! Where the active identity is persisted between uses.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::Identity;
use crate::ClientError;

/// Persistence for the one active identity.
pub trait IdentityStore: Send + Sync {
    fn load(&self) -> Result<Option<Identity>, ClientError>;
    fn save(&self, identity: &Identity) -> Result<(), ClientError>;
    fn clear(&self) -> Result<(), ClientError>;
}

/// Keeps the identity for the life of the process.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Identity>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryStore {
    fn load(&self) -> Result<Option<Identity>, ClientError> {
        Ok(self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, identity: &Identity) -> Result<(), ClientError> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(identity.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}

/// JSON file on disk, so a restarted client keeps its session.
pub struct FileStore {
    path: PathBuf,
}

fn se(e: &impl std::fmt::Display) -> ClientError {
    ClientError::Storage(e.to_string())
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IdentityStore for FileStore {
    fn load(&self) -> Result<Option<Identity>, ClientError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(se(&e)),
        };
        let identity = serde_json::from_str(&contents).map_err(|e| se(&e))?;
        debug!(path = %self.path.display(), "Loaded stored identity");
        Ok(Some(identity))
    }

    fn save(&self, identity: &Identity) -> Result<(), ClientError> {
        let json = serde_json::to_string_pretty(identity).map_err(|e| se(&e))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| se(&e))?;
        }

        // The session id is a bearer credential
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = std::fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .map_err(|e| se(&e))?;
            file.write_all(json.as_bytes()).map_err(|e| se(&e))?;
        }
        #[cfg(not(unix))]
        {
            std::fs::write(&self.path, &json).map_err(|e| se(&e))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<(), ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(se(&e)),
        }
    }
}
