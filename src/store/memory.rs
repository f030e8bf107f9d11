use super::snapshot::SnapshotFile;
use super::{LeaderboardSync, ProgressStore, StoreEvent, StoreResult};
use crate::types::{Identity, LeaderboardEntry, ProgressRecord};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, RwLock};

const PROGRESS_FILE: &str = "progress.json";
const LEADERBOARD_FILE: &str = "leaderboard.json";
const RETRY_BACKOFF: Duration = Duration::from_millis(25);

struct Snapshots {
    progress: SnapshotFile,
    leaderboard: SnapshotFile,
}

/// Records and their leaderboard projection, keyed by (player, team).
///
/// With a snapshot directory every mutation is flushed to `progress.json` and
/// `leaderboard.json`; the two files are written independently, like the two
/// backends they stand in for. Both files hold plain lists; the key is
/// rebuilt from each item's identity on load.
pub struct MemoryStore {
    records: RwLock<HashMap<Identity, ProgressRecord>>,
    entries: RwLock<HashMap<Identity, LeaderboardEntry>>,
    pending: Mutex<HashSet<Identity>>,
    snapshots: Option<Snapshots>,
    retries: u32,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    /// Volatile store, nothing touches disk
    pub fn new() -> Self {
        let (events, _rx) = broadcast::channel(100);
        Self {
            records: RwLock::new(HashMap::new()),
            entries: RwLock::new(HashMap::new()),
            pending: Mutex::new(HashSet::new()),
            snapshots: None,
            retries: 2,
            events,
        }
    }

    /// Store backed by snapshot files in `dir`, loading what is already there
    pub async fn open(dir: impl AsRef<Path>, retries: u32) -> StoreResult<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let snapshots = Snapshots {
            progress: SnapshotFile::new(dir.join(PROGRESS_FILE)),
            leaderboard: SnapshotFile::new(dir.join(LEADERBOARD_FILE)),
        };
        let records: HashMap<Identity, ProgressRecord> = snapshots
            .progress
            .load::<Vec<ProgressRecord>>()
            .await?
            .unwrap_or_default()
            .into_iter()
            .map(|record| (record.identity(), record))
            .collect();
        let stored_entries: HashMap<Identity, LeaderboardEntry> = snapshots
            .leaderboard
            .load::<Vec<LeaderboardEntry>>()
            .await?
            .unwrap_or_default()
            .into_iter()
            .map(|entry| (entry.identity(), entry))
            .collect();

        // The projection is derived data; rebuild it from the records
        let entries: HashMap<Identity, LeaderboardEntry> = records
            .iter()
            .map(|(key, record)| (key.clone(), LeaderboardEntry::from(record)))
            .collect();
        if entries != stored_entries {
            tracing::info!(
                records = records.len(),
                stale_entries = stored_entries.len(),
                "Rebuilt leaderboard projection from progress snapshot"
            );
            snapshots.leaderboard.save(&listed(&entries)).await?;
        }

        tracing::info!(
            dir = %dir.display(),
            records = records.len(),
            "Opened progress store"
        );

        let (events, _rx) = broadcast::channel(100);
        Ok(Self {
            records: RwLock::new(records),
            entries: RwLock::new(entries),
            pending: Mutex::new(HashSet::new()),
            snapshots: Some(snapshots),
            retries,
            events,
        })
    }

    /// Write (or remove) one projection entry, rolling back on failure
    async fn write_projection(&self, key: &Identity, entry: Option<LeaderboardEntry>) -> StoreResult<()> {
        let mut entries = self.entries.write().await;
        let previous = match entry {
            Some(entry) => entries.insert(key.clone(), entry),
            None => entries.remove(key),
        };
        if let Some(snapshots) = &self.snapshots {
            if let Err(e) = snapshots.leaderboard.save(&listed(&*entries)).await {
                match previous {
                    Some(previous) => entries.insert(key.clone(), previous),
                    None => entries.remove(key),
                };
                return Err(e);
            }
        }
        Ok(())
    }

    async fn sync_projection(&self, key: &Identity, entry: Option<LeaderboardEntry>) -> LeaderboardSync {
        for attempt in 0..=self.retries {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            match self.write_projection(key, entry.clone()).await {
                Ok(()) => {
                    self.pending.lock().await.remove(key);
                    return LeaderboardSync::Synced;
                }
                Err(e) => {
                    tracing::warn!(player = %key, attempt, error = %e, "Leaderboard projection write failed");
                }
            }
        }
        self.pending.lock().await.insert(key.clone());
        tracing::error!(player = %key, "Leaderboard projection queued for resync");
        LeaderboardSync::Pending
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Snapshot form of a keyed map: the values, in key order
fn listed<T: Clone>(map: &HashMap<Identity, T>) -> Vec<T> {
    let mut items: Vec<(&Identity, &T)> = map.iter().collect();
    items.sort_by(|a, b| {
        (&a.0.team_id, &a.0.player_name).cmp(&(&b.0.team_id, &b.0.player_name))
    });
    items.into_iter().map(|(_, item)| item.clone()).collect()
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn get(&self, identity: &Identity) -> StoreResult<Option<ProgressRecord>> {
        Ok(self
            .records
            .read()
            .await
            .get(identity)
            .cloned())
    }

    async fn upsert(&self, record: ProgressRecord) -> StoreResult<LeaderboardSync> {
        if let Err(e) = self.resync_leaderboard().await {
            tracing::warn!(error = %e, "Leaderboard resync before write failed");
        }

        let key = record.identity();
        {
            let mut records = self.records.write().await;
            let previous = records.insert(key.clone(), record.clone());
            if let Some(snapshots) = &self.snapshots {
                if let Err(e) = snapshots.progress.save(&listed(&*records)).await {
                    match previous {
                        Some(previous) => records.insert(key.clone(), previous),
                        None => records.remove(&key),
                    };
                    tracing::error!(player = %key, error = %e, "Progress record write failed");
                    return Err(e);
                }
            }
        }

        let entry = LeaderboardEntry::from(&record);
        let sync = self.sync_projection(&key, Some(entry.clone())).await;
        if sync == LeaderboardSync::Synced {
            self.publish(StoreEvent::Upserted { entry });
        }
        tracing::debug!(player = %key, solved = record.solved_count(), ?sync, "Saved progress");
        Ok(sync)
    }

    async fn delete(&self, identity: &Identity) -> StoreResult<()> {
        let key = identity.clone();
        {
            let mut records = self.records.write().await;
            let Some(previous) = records.remove(&key) else {
                return Ok(());
            };
            if let Some(snapshots) = &self.snapshots {
                if let Err(e) = snapshots.progress.save(&listed(&*records)).await {
                    records.insert(key.clone(), previous);
                    tracing::error!(player = %key, error = %e, "Progress record delete failed");
                    return Err(e);
                }
            }
        }

        if self.sync_projection(&key, None).await == LeaderboardSync::Synced {
            self.publish(StoreEvent::Deleted {
                player_name: identity.player_name.clone(),
                team_id: identity.team_id.clone(),
            });
        }
        tracing::info!(player = %key, "Deleted progress");
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<ProgressRecord>> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn leaderboard(&self) -> StoreResult<Vec<LeaderboardEntry>> {
        if let Err(e) = self.resync_leaderboard().await {
            tracing::warn!(error = %e, "Leaderboard resync before read failed");
        }
        Ok(self.entries.read().await.values().cloned().collect())
    }

    async fn resync_leaderboard(&self) -> StoreResult<usize> {
        let keys: Vec<Identity> = self.pending.lock().await.iter().cloned().collect();
        if keys.is_empty() {
            return Ok(0);
        }

        for key in keys {
            let entry = self.records.read().await.get(&key).map(LeaderboardEntry::from);
            match self.write_projection(&key, entry.clone()).await {
                Ok(()) => {
                    self.pending.lock().await.remove(&key);
                    match entry {
                        Some(entry) => self.publish(StoreEvent::Upserted { entry }),
                        None => self.publish(StoreEvent::Deleted {
                            player_name: key.player_name.clone(),
                            team_id: key.team_id.clone(),
                        }),
                    }
                    tracing::info!(player = %key, "Leaderboard projection resynced");
                }
                Err(e) => {
                    tracing::warn!(player = %key, error = %e, "Leaderboard projection still failing");
                }
            }
        }

        Ok(self.pending.lock().await.len())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}
