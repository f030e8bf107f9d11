//! Leaderboard ranking.

use crate::types::{LeaderboardEntry, ProgressRecord};
use std::cmp::Ordering;

/// Ranking order: finished players first, then more puzzles solved. Among
/// finished players the faster time wins; among unfinished ones the most
/// recently active wins.
pub fn compare(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    b.is_complete
        .cmp(&a.is_complete)
        .then_with(|| b.puzzles_completed.cmp(&a.puzzles_completed))
        .then_with(|| {
            if a.is_complete && b.is_complete {
                a.completion_time.cmp(&b.completion_time)
            } else {
                b.updated_at.cmp(&a.updated_at)
            }
        })
}

/// Rank already-projected entries, dropping anyone who has not solved a puzzle
pub fn rank_entries(entries: impl IntoIterator<Item = LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    let mut ranked: Vec<LeaderboardEntry> = entries
        .into_iter()
        .filter(|e| e.puzzles_completed > 0)
        .collect();
    ranked.sort_by(compare);
    ranked
}

pub fn rank(records: &[ProgressRecord]) -> Vec<LeaderboardEntry> {
    rank_entries(records.iter().map(LeaderboardEntry::from))
}

/// First `limit` ranked entries, or all of them
pub fn top(ranked: Vec<LeaderboardEntry>, limit: Option<usize>) -> Vec<LeaderboardEntry> {
    match limit {
        Some(limit) => ranked.into_iter().take(limit).collect(),
        None => ranked,
    }
}
