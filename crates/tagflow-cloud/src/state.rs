//! Desired-state persistence
//!
//! The desired-state file is both the input of a run and the place where
//! discovered ids are written back. The previous content is kept next to it
//! as `<file>.bak` before every rewrite.

use crate::error::{CloudError, Result};
use crate::model::DesiredState;
use std::path::{Path, PathBuf};
use tokio::fs;

const BACKUP_EXTENSION: &str = "bak";

/// Reads and rewrites one desired-state file
#[derive(Debug, Clone)]
pub struct DesiredStateStore {
    path: PathBuf,
}

impl DesiredStateStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Backup file path
    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(BACKUP_EXTENSION);
        PathBuf::from(name)
    }

    /// Load the document
    pub async fn load(&self) -> Result<DesiredState> {
        if !self.path.exists() {
            return Err(CloudError::StateError(format!(
                "{} does not exist",
                self.path.display()
            )));
        }

        let content = fs::read_to_string(&self.path).await?;
        let state = DesiredState::from_yaml(&content)?;
        tracing::debug!(path = %self.path.display(), regions = state.regions().len(), "Loaded desired state");
        Ok(state)
    }

    /// Rewrite the document in place
    pub async fn save(&self, state: &DesiredState) -> Result<()> {
        let content = state.to_yaml()?;

        if self.path.exists() {
            fs::copy(&self.path, self.backup_path()).await?;
            tracing::debug!("Created desired state backup");
        }

        fs::write(&self.path, content).await?;
        tracing::debug!(path = %self.path.display(), "Saved desired state");
        Ok(())
    }
}
