use super::cipher::encipher;
use super::key::LabelledOption;
use super::shuffle::{identity_seed, ShuffleFn};
use super::{AnswerKey, PuzzleStages};
use crate::types::{Identity, PuzzleId};
use serde::{Deserialize, Serialize};

/// A suspect card on the alibi board
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiddleCard {
    pub id: String,
    pub riddle: String,
    /// Revealed only after the riddle is answered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Puzzle-specific payload sent with a puzzle screen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BriefingBody {
    Weapon {
        letters: String,
    },
    Timeline {
        events: Vec<LabelledOption>,
    },
    Alibis {
        suspects: Vec<RiddleCard>,
        timeslots: Vec<String>,
    },
    Deduction {
        suspects: Vec<String>,
        weapons: Vec<String>,
    },
    Contradictions {
        statements: Vec<LabelledOption>,
        pick: usize,
    },
    Query,
    Cipher {
        ciphertext: String,
        decoded: bool,
    },
    Inspection {
        required: usize,
    },
    Final {
        ciphertext: String,
        decoded: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Briefing {
    pub puzzle: PuzzleId,
    pub title: String,
    pub body: BriefingBody,
}

/// Build the screen payload for `puzzle` as seen by `identity`
pub fn briefing(
    puzzle: PuzzleId,
    identity: &Identity,
    stages: &PuzzleStages,
    key: &AnswerKey,
    shuffle: ShuffleFn,
) -> Briefing {
    let seed = identity_seed(identity);
    let body = match puzzle.get() {
        1 => BriefingBody::Weapon {
            letters: key.weapon_letters.clone(),
        },
        2 => {
            let mut events = key.timeline.clone();
            shuffle(&mut events, seed);
            BriefingBody::Timeline { events }
        }
        3 => BriefingBody::Alibis {
            suspects: key
                .alibis
                .iter()
                .map(|s| RiddleCard {
                    id: s.id.clone(),
                    riddle: s.riddle.clone(),
                    name: stages.is_unlocked(&s.id).then(|| s.name.clone()),
                })
                .collect(),
            timeslots: key.timeslots.clone(),
        },
        4 => BriefingBody::Deduction {
            suspects: key.suspects.clone(),
            weapons: key.weapons.clone(),
        },
        5 => {
            let mut statements: Vec<LabelledOption> = key
                .contradictions
                .iter()
                .map(|c| LabelledOption {
                    id: c.id.clone(),
                    label: c.statement.clone(),
                })
                .collect();
            // Different salt from the timeline so the two orders are independent
            shuffle(&mut statements, seed.rotate_left(17));
            BriefingBody::Contradictions {
                statements,
                pick: key.correct_contradictions().len(),
            }
        }
        6 => BriefingBody::Query,
        7 => BriefingBody::Cipher {
            ciphertext: encipher(&key.cipher_plaintext, &key.cipher_alphabet),
            decoded: stages.cipher_decoded,
        },
        8 => BriefingBody::Inspection {
            required: key.hidden_clue_threshold,
        },
        _ => BriefingBody::Final {
            ciphertext: encipher(&key.final_plaintext, &key.cipher_alphabet),
            decoded: stages.final_decoded,
        },
    };

    Briefing {
        puzzle,
        title: puzzle.title().to_string(),
        body,
    }
}
