//! JSON snapshot files.
//!
//! Written to a sibling temp file and renamed into place so a crash never
//! leaves a half-written snapshot behind.

use super::StoreResult;
use serde::{de::DeserializeOwned, Serialize};
use std::path::PathBuf;

/// Bump when the on-disk layout changes
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(serde::Serialize, serde::Deserialize)]
struct Envelope<T> {
    schema_version: u32,
    saved_at: String,
    data: T,
}

#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the snapshot, `None` if the file does not exist yet
    pub async fn load<T: DeserializeOwned>(&self) -> StoreResult<Option<T>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let envelope: Envelope<T> = serde_json::from_str(&raw)?;
        if envelope.schema_version > SNAPSHOT_SCHEMA_VERSION {
            return Err(super::StoreError::Unavailable(format!(
                "snapshot {} has schema version {}, newer than supported {}",
                self.path.display(),
                envelope.schema_version,
                SNAPSHOT_SCHEMA_VERSION
            )));
        }
        Ok(Some(envelope.data))
    }

    pub async fn save<T: Serialize>(&self, data: &T) -> StoreResult<()> {
        let envelope = Envelope {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            saved_at: chrono::Utc::now().to_rfc3339(),
            data,
        };
        let json = serde_json::to_vec_pretty(&envelope)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}
