//! Persistence gateway.
//!
//! One trait, one backend. Every record write regenerates the record's
//! leaderboard projection in the same call.

mod memory;
pub mod snapshot;

pub use memory::MemoryStore;

use crate::types::{Identity, LeaderboardEntry, ProgressRecord};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage encoding failed: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Whether the leaderboard projection landed together with the record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardSync {
    Synced,
    /// Record saved; projection queued for `resync_leaderboard`
    Pending,
}

/// Change notification for live leaderboards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum StoreEvent {
    Upserted { entry: LeaderboardEntry },
    Deleted { player_name: String, team_id: String },
}

#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn get(&self, identity: &Identity) -> StoreResult<Option<ProgressRecord>>;

    /// Full overwrite keyed on (player, team); last write wins.
    ///
    /// A failed record write returns an error and leaves the projection
    /// untouched. A failed projection write never loses the record.
    async fn upsert(&self, record: ProgressRecord) -> StoreResult<LeaderboardSync>;

    /// Remove the record and its projection
    async fn delete(&self, identity: &Identity) -> StoreResult<()>;

    async fn list_all(&self) -> StoreResult<Vec<ProgressRecord>>;

    /// Current projection (unsorted)
    async fn leaderboard(&self) -> StoreResult<Vec<LeaderboardEntry>>;

    /// Retry projection writes that failed earlier; returns how many are
    /// still pending
    async fn resync_leaderboard(&self) -> StoreResult<usize>;

    /// Drop the receiver to unsubscribe
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}
