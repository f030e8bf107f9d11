//! Puzzle validators.
//!
//! Every validator is a pure function of the answer, the session's stage
//! scratch and the answer key. Validators never see storage and never mutate
//! anything; the progression controller applies the resulting patch.

mod briefing;
pub mod cipher;
pub mod key;
mod rules;
pub mod shuffle;

pub use briefing::{briefing, Briefing, BriefingBody, RiddleCard};
pub use key::{AnswerKey, KeyError};
pub use rules::validate;

use crate::types::PuzzleId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A candidate answer as submitted by the UI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Answer {
    /// Puzzle 1: the unscrambled weapon
    Weapon { word: String },
    /// Puzzle 2: event ids in chronological order
    Timeline { order: Vec<String> },
    /// Puzzle 3 gate: riddle that reveals one suspect
    AlibiRiddle { suspect: String, answer: String },
    /// Puzzle 3: suspect id -> timeslot
    Alibis { placements: BTreeMap<String, String> },
    /// Puzzle 4
    Deduction { suspect: String, weapon: String },
    /// Puzzle 5: selected contradiction ids
    Contradictions { selected: Vec<String> },
    /// Puzzle 6
    Query { text: String },
    /// Puzzle 7 stage (a)
    CipherMessage { text: String },
    /// Puzzle 7 stage (b)
    ClueDump { text: String },
    /// Puzzle 8: hidden clue triggers the player found
    Inspection { found: Vec<String> },
    /// Puzzle 9 stage (a)
    FinalMessage { text: String },
    /// Puzzle 9 stage (b)
    Accusation { text: String },
}

impl Answer {
    pub fn puzzle(&self) -> PuzzleId {
        let n = match self {
            Answer::Weapon { .. } => 1,
            Answer::Timeline { .. } => 2,
            Answer::AlibiRiddle { .. } | Answer::Alibis { .. } => 3,
            Answer::Deduction { .. } => 4,
            Answer::Contradictions { .. } => 5,
            Answer::Query { .. } => 6,
            Answer::CipherMessage { .. } | Answer::ClueDump { .. } => 7,
            Answer::Inspection { .. } => 8,
            Answer::FinalMessage { .. } | Answer::Accusation { .. } => 9,
        };
        PuzzleId::of(n)
    }
}

/// Intermediate gate cleared inside a multi-stage puzzle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "suspect", rename_all = "snake_case")]
pub enum Stage {
    SuspectUnlocked(String),
    CipherDecoded,
    FinalDecoded,
}

/// Session-only scratch for multi-stage puzzles. Not persisted; a reload asks
/// the gates again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PuzzleStages {
    pub unlocked_suspects: BTreeSet<String>,
    pub cipher_decoded: bool,
    pub final_decoded: bool,
}

impl PuzzleStages {
    pub fn apply(&mut self, stage: &Stage) {
        match stage {
            Stage::SuspectUnlocked(id) => {
                self.unlocked_suspects.insert(id.to_uppercase());
            }
            Stage::CipherDecoded => self.cipher_decoded = true,
            Stage::FinalDecoded => self.final_decoded = true,
        }
    }

    pub fn is_unlocked(&self, suspect_id: &str) -> bool {
        self.unlocked_suspects
            .contains(&suspect_id.trim().to_uppercase())
    }
}

/// Which completion stamp a solve carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStamp {
    None,
    /// Puzzle 3's mid-game stamp
    Checkpoint,
    /// Puzzle 9
    Final,
}

/// Record changes a validator asks for on accept
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    pub puzzle: PuzzleId,
    pub weapon: Option<String>,
    pub killer: Option<String>,
    pub current_page: Option<u8>,
    pub completion: CompletionStamp,
}

impl Patch {
    pub fn solve(puzzle: PuzzleId) -> Self {
        Self {
            puzzle,
            weapon: None,
            killer: None,
            current_page: None,
            completion: CompletionStamp::None,
        }
    }

    pub fn with_page(mut self) -> Self {
        self.current_page = Some(self.puzzle.get());
        self
    }
}

/// Outcome of a validator
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accept(Patch),
    StageCleared(Stage),
    Reject(String),
}

/// Comparison form: trimmed and upper-cased
pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_uppercase()
}
