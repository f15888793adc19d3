use crate::domain_model::{RelationshipRecord, UserId};
use crate::domain_port::*;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// One pretty-printed JSON file per user, `<root>/<user_id>.json`.
///
/// Saves go through a temporary file in the same directory that is persisted
/// over the target, so a reader observes either the old record or the new
/// one in full.
pub struct FsRelationshipStore {
    root: PathBuf,
}

impl FsRelationshipStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, user_id: &UserId) -> PathBuf {
        self.root.join(format!("{user_id}.json"))
    }
}

#[async_trait::async_trait]
impl RelationshipStore for FsRelationshipStore {
    async fn load(&self, user_id: &UserId) -> Result<RelationshipRecord, StoreError> {
        match tokio::fs::read(self.path(user_id)).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RelationshipRecord::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, user_id: &UserId, record: &RelationshipRecord) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(record)?;
        let len = bytes.len();
        let root = self.root.clone();
        let path = self.path(user_id);

        // the temp file is unlinked on drop, so every early return cleans up
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut temp = NamedTempFile::new_in(&root)?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            temp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("file write task failed: {e}")))??;

        debug!(key = %user_id, bytes = len, "relationship record written");
        Ok(())
    }
}
