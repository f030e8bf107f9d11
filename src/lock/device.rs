//! Device-scoped flags that outlive a session.

use crate::store::snapshot::SnapshotFile;
use crate::store::StoreResult;
use crate::types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;

const DEVICES_FILE: &str = "devices.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Permanent single-use lock
    #[serde(default)]
    pub completed: bool,
    /// Cached player identity for "continue"
    #[serde(default)]
    pub identity: Option<Identity>,
    /// A game was started on this device and not yet finished or abandoned
    #[serde(default)]
    pub active_session: bool,
}

/// Flags per device id, optionally flushed to `devices.json`
pub struct DeviceFlags {
    devices: RwLock<HashMap<String, DeviceRecord>>,
    snapshot: Option<SnapshotFile>,
}

impl DeviceFlags {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(HashMap::new()),
            snapshot: None,
        }
    }

    pub async fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;
        let snapshot = SnapshotFile::new(dir.join(DEVICES_FILE));
        let devices: HashMap<String, DeviceRecord> = snapshot.load().await?.unwrap_or_default();
        let locked = devices.values().filter(|d| d.completed).count();
        tracing::info!(devices = devices.len(), locked, "Loaded device flags");
        Ok(Self {
            devices: RwLock::new(devices),
            snapshot: Some(snapshot),
        })
    }

    pub async fn get(&self, device: &str) -> DeviceRecord {
        self.devices
            .read()
            .await
            .get(device)
            .cloned()
            .unwrap_or_default()
    }

    /// Apply `change` to one device and persist; the in-memory copy is
    /// restored if the write fails
    pub async fn update<F>(&self, device: &str, change: F) -> StoreResult<DeviceRecord>
    where
        F: FnOnce(&mut DeviceRecord),
    {
        let mut devices = self.devices.write().await;
        let previous = devices.get(device).cloned();
        let mut record = previous.clone().unwrap_or_default();
        change(&mut record);
        devices.insert(device.to_string(), record.clone());

        if let Some(snapshot) = &self.snapshot {
            if let Err(e) = snapshot.save(&*devices).await {
                match previous {
                    Some(previous) => devices.insert(device.to_string(), previous),
                    None => devices.remove(device),
                };
                return Err(e);
            }
        }
        Ok(record)
    }
}

impl Default for DeviceFlags {
    fn default() -> Self {
        Self::new()
    }
}
