pub mod export;
mod progress;

use crate::config::GameConfig;
use crate::error::StartupError;
use crate::lock::{DeviceFlags, DeviceLockGuard, LockPolicy};
use crate::protocol::ServerMessage;
use crate::puzzles::shuffle::{seeded_shuffle, ShuffleFn};
use crate::puzzles::AnswerKey;
use crate::store::{MemoryStore, ProgressStore};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn ProgressStore>,
    pub devices: Arc<DeviceFlags>,
    pub key: Arc<AnswerKey>,
    pub config: GameConfig,
    pub lock_policy: Arc<LockPolicy>,
    /// Option order for puzzles 2 and 5
    pub shuffle: ShuffleFn,
    /// Ranked leaderboard pushes for every connected session
    pub leaderboard_broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    /// In-memory state with the built-in case
    pub fn new(config: GameConfig) -> Self {
        Self::with_parts(
            Arc::new(MemoryStore::new()),
            Arc::new(DeviceFlags::new()),
            AnswerKey::default(),
            config,
        )
    }

    pub fn with_parts(
        store: Arc<dyn ProgressStore>,
        devices: Arc<DeviceFlags>,
        key: AnswerKey,
        config: GameConfig,
    ) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            store,
            devices,
            key: Arc::new(key),
            lock_policy: Arc::new(config.lock.clone()),
            config,
            shuffle: seeded_shuffle,
            leaderboard_broadcast: tx,
        }
    }

    /// Build from config: load the case file and open snapshots if configured
    pub async fn from_config(config: GameConfig) -> Result<Self, StartupError> {
        let key = match &config.answer_key_path {
            Some(path) => {
                let key = AnswerKey::from_file(path)?;
                tracing::info!(path = %path.display(), "Loaded answer key");
                key
            }
            None => AnswerKey::default(),
        };

        let (store, devices) = match &config.snapshot_dir {
            Some(dir) => (
                MemoryStore::open(dir, config.leaderboard_retries).await?,
                DeviceFlags::open(dir).await?,
            ),
            None => {
                tracing::warn!("SNAPSHOT_DIR not set, progress is kept in memory only");
                (MemoryStore::new(), DeviceFlags::new())
            }
        };

        Ok(Self::with_parts(
            Arc::new(store),
            Arc::new(devices),
            key,
            config,
        ))
    }

    /// Lock guard for one connection on `device`
    pub fn lock_guard(&self, device: &str) -> DeviceLockGuard {
        DeviceLockGuard::new(device, self.devices.clone(), self.lock_policy.clone())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
