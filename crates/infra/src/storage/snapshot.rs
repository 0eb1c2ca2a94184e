//! File-backed key→document store with atomic writes
//!
//! One JSON file per key inside a data directory. Every save is a whole
//! replace: serialize, write to a temp file, fsync, rename. A crash can
//! lose the write in flight, never corrupt the previous one.

use std::path::{Path, PathBuf};

use satchel_domain::{Result, SatchelError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

use crate::errors::InfraError;

const SNAPSHOT_EXT: &str = "json";

/// Durable whole-document storage under one directory.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The backing directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Serialize `value` and atomically replace the document at `key`.
    #[instrument(skip(self, value))]
    pub async fn save<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<()> {
        let data = serde_json::to_vec(value).map_err(InfraError::from)?;
        let path = self.path_for(key);

        // Write to a temporary file first for atomicity
        let temp_path = path.with_extension("tmp");

        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent).await.map_err(InfraError::from)?;
        }

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .await
            .map_err(InfraError::from)?;

        file.write_all(&data).await.map_err(InfraError::from)?;
        file.sync_all().await.map_err(InfraError::from)?;
        drop(file);

        // Atomic rename
        fs::rename(&temp_path, &path).await.map_err(InfraError::from)?;

        debug!(key, bytes = data.len(), "snapshot saved");
        Ok(())
    }

    /// Load and deserialize the document at `key`; `None` when absent.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path_for(key);

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(InfraError::from(err).into()),
        };

        let value = serde_json::from_slice(&data).map_err(|e| {
            SatchelError::Serialization(format!("snapshot {key} is unreadable: {e}"))
        })?;
        Ok(Some(value))
    }

    /// Remove the document at `key`. Returns whether anything was deleted.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(InfraError::from(err).into()),
        }
    }

    /// Keys of every stored document.
    pub async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(err) => return Err(InfraError::from(err).into()),
        };

        while let Some(entry) = entries.next_entry().await.map_err(InfraError::from)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }

        keys.sort();
        Ok(keys)
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{SNAPSHOT_EXT}", sanitize_key(key)))
    }
}

/// Keep keys filesystem-safe; anything outside a conservative character set
/// becomes a dash.
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '-' })
        .collect()
}
