//! Persisted user identity.

use std::path::{Path, PathBuf};

use mailguard_core::Identity;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::Result;
use crate::config::config_dir;

#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    user_email: String,
}

/// Reads and writes the identity file (`{"user_email": ...}`).
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new(config_dir().join("identity.json"))
    }
}

impl IdentityStore {
    /// Store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// File location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the saved identity. A missing file or a blank saved value
    /// yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed.
    pub async fn load(&self) -> Result<Option<Identity>> {
        if !tokio::fs::try_exists(&self.path).await? {
            return Ok(None);
        }
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let stored: StoredIdentity = serde_json::from_str(&contents)?;
        match Identity::new(stored.user_email) {
            Ok(identity) => Ok(Some(identity)),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Ignoring saved identity");
                Ok(None)
            }
        }
    }

    /// Saves `identity`, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be written.
    pub async fn save(&self, identity: &Identity) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let stored = StoredIdentity {
            user_email: identity.as_str().to_string(),
        };
        let contents = serde_json::to_string_pretty(&stored)?;
        tokio::fs::write(&self.path, contents).await?;
        info!(identity = identity.as_str(), path = %self.path.display(), "Identity saved");
        Ok(())
    }

    /// Removes the saved identity. Returns whether a file was removed.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
