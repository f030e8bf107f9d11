use super::AppState;
use crate::error::GameResult;
use crate::leaderboard;
use crate::puzzles::{briefing, Briefing, PuzzleStages};
use crate::store::LeaderboardSync;
use crate::types::{now_ms, Identity, LeaderboardEntry, ProgressRecord, PuzzleId};

impl AppState {
    /// Load the record for `identity`, creating it on first sight
    pub async fn start(&self, identity: &Identity) -> GameResult<ProgressRecord> {
        if let Some(record) = self.store.get(identity).await? {
            tracing::info!(player = %identity, solved = record.solved_count(), "Resuming play-through");
            return Ok(record);
        }

        let record = ProgressRecord::fresh(identity, now_ms());
        self.store.upsert(record.clone()).await?;
        tracing::info!(player = %identity, "Started new play-through");
        Ok(record)
    }

    pub async fn load(&self, identity: &Identity) -> GameResult<Option<ProgressRecord>> {
        Ok(self.store.get(identity).await?)
    }

    /// Persist a record built by the controller.
    ///
    /// The incoming record is merged onto whatever is stored so a stale
    /// session can never take progress away. Returns what was written.
    pub async fn commit(&self, record: ProgressRecord) -> GameResult<(ProgressRecord, LeaderboardSync)> {
        let mut merged = match self.store.get(&record.identity()).await? {
            Some(stored) => record.merge_onto(&stored),
            None => record,
        };
        merged.updated_at = now_ms();

        let sync = self.store.upsert(merged.clone()).await?;
        if sync == LeaderboardSync::Pending {
            tracing::warn!(player = %merged.identity(), "Progress saved, leaderboard entry pending");
        }
        Ok((merged, sync))
    }

    /// "Play again": remove the record and its leaderboard entry
    pub async fn reset(&self, identity: &Identity) -> GameResult<()> {
        self.store.delete(identity).await?;
        tracing::info!(player = %identity, "Progress reset");
        Ok(())
    }

    /// Ranked standings, truncated to `limit` when given
    pub async fn leaderboard(&self, limit: Option<usize>) -> GameResult<Vec<LeaderboardEntry>> {
        let entries = self.store.leaderboard().await?;
        Ok(leaderboard::top(leaderboard::rank_entries(entries), limit))
    }

    pub fn briefing(&self, puzzle: PuzzleId, identity: &Identity, stages: &PuzzleStages) -> Briefing {
        briefing(puzzle, identity, stages, &self.key, self.shuffle)
    }
}
