//! Per-player option ordering.
//!
//! Options for the timeline and contradiction puzzles are shown in an order
//! seeded by the player's identity: stable across reloads, different between
//! players. Not meant to be cryptographically sound.

use crate::types::Identity;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use sha2::{Digest, Sha256};

use super::key::LabelledOption;

/// Shuffle strategy injected into briefings
pub type ShuffleFn = fn(&mut [LabelledOption], u64);

/// Seed derived from `player_name + team_id`
pub fn identity_seed(identity: &Identity) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(identity.player_name.as_bytes());
    hasher.update(identity.team_id.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Deterministic Fisher-Yates shuffle
pub fn seeded_shuffle<T>(items: &mut [T], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
}

/// Leaves the order untouched
pub fn keep_order(_items: &mut [LabelledOption], _seed: u64) {}
