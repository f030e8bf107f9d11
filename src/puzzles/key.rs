//! The case file: every fixed answer the validators check against.

use super::cipher;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("failed to read answer key: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse answer key: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid answer key: {0}")]
    Invalid(String),
}

/// A labelled option shown to the player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelledOption {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlibiSuspect {
    pub id: String,
    pub name: String,
    pub riddle: String,
    pub riddle_answer: String,
    pub timeslot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contradiction {
    pub id: String,
    pub statement: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerKey {
    /// Scrambled letters shown for puzzle 1
    pub weapon_letters: String,
    pub weapon_word: String,
    /// Display form written to the record
    pub weapon_name: String,
    /// Timeline events in their true order
    pub timeline: Vec<LabelledOption>,
    pub alibis: Vec<AlibiSuspect>,
    pub timeslots: Vec<String>,
    pub suspects: Vec<String>,
    pub weapons: Vec<String>,
    pub killer: String,
    pub contradictions: Vec<Contradiction>,
    pub query_needle: String,
    /// Substitution alphabet: plaintext `A..Z` maps to these letters
    pub cipher_alphabet: String,
    pub cipher_plaintext: String,
    pub clue_keywords: Vec<String>,
    pub clue_keyword_threshold: usize,
    pub hidden_clues: Vec<String>,
    pub hidden_clue_threshold: usize,
    pub final_plaintext: String,
}

fn option(id: &str, label: &str) -> LabelledOption {
    LabelledOption {
        id: id.to_string(),
        label: label.to_string(),
    }
}

impl Default for AnswerKey {
    fn default() -> Self {
        Self {
            weapon_letters: "GREGDA".to_string(),
            weapon_word: "DAGGER".to_string(),
            weapon_name: "Dagger".to_string(),
            timeline: vec![
                option("dinner_served", "Dinner is served in the great hall"),
                option("argument_heard", "Raised voices from the study"),
                option("lights_out", "The manor lights go out"),
                option("scream", "A scream from the library"),
                option("body_found", "The body is discovered"),
            ],
            alibis: vec![
                AlibiSuspect {
                    id: "graves".to_string(),
                    name: "Colonel Graves".to_string(),
                    riddle: "I have keys but open no locks. What am I?".to_string(),
                    riddle_answer: "PIANO".to_string(),
                    timeslot: "21:00".to_string(),
                },
                AlibiSuspect {
                    id: "lane".to_string(),
                    name: "Marguerite Lane".to_string(),
                    riddle: "The more you take, the more you leave behind. What are they?"
                        .to_string(),
                    riddle_answer: "FOOTSTEPS".to_string(),
                    timeslot: "21:30".to_string(),
                },
                AlibiSuspect {
                    id: "finch".to_string(),
                    name: "Thomas Finch".to_string(),
                    riddle: "I have hands but cannot clap. What am I?".to_string(),
                    riddle_answer: "CLOCK".to_string(),
                    timeslot: "22:00".to_string(),
                },
            ],
            timeslots: ["20:30", "21:00", "21:30", "22:00", "22:30"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            suspects: [
                "Colonel Graves",
                "Evelyn Ashford",
                "Dr. Edmund Hale",
                "Marguerite Lane",
                "Thomas Finch",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            weapons: ["Dagger", "Revolver", "Candlestick", "Rope", "Poison"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            killer: "Evelyn Ashford".to_string(),
            contradictions: vec![
                Contradiction {
                    id: "sealed_windows".to_string(),
                    statement: "Graves heard the scream through the garden window, \
                                yet every library window was painted shut."
                        .to_string(),
                    correct: true,
                },
                Contradiction {
                    id: "dry_boots".to_string(),
                    statement: "Ashford claims she walked the grounds in the rain, \
                                but her boots were dry at ten."
                        .to_string(),
                    correct: true,
                },
                Contradiction {
                    id: "stopped_clock".to_string(),
                    statement: "Finch set the hall clock at half past nine, \
                                the clock had stopped at nine."
                        .to_string(),
                    correct: true,
                },
                Contradiction {
                    id: "red_wine".to_string(),
                    statement: "Lane poured red wine while the others drank port.".to_string(),
                    correct: false,
                },
                Contradiction {
                    id: "open_letter".to_string(),
                    statement: "Dr. Hale left a letter unsealed on the desk.".to_string(),
                    correct: false,
                },
            ],
            query_needle: "AMOUNT > 10000".to_string(),
            cipher_alphabet: "QWERTYUIOPASDFGHJKLZXCVBNM".to_string(),
            cipher_plaintext: "THE LEDGER HIDES THE MOTIVE".to_string(),
            clue_keywords: ["LEDGER", "TRANSFER", "ASHFORD", "MIDNIGHT"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            clue_keyword_threshold: 3,
            hidden_clues: ["portrait_hover", "safe_button", "margin_selection"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            hidden_clue_threshold: 2,
            final_plaintext: "EVELYN ASHFORD IN THE LIBRARY WITH THE DAGGER".to_string(),
        }
    }
}

impl AnswerKey {
    /// Load a case file and check it is self-consistent
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let raw = std::fs::read_to_string(path)?;
        let key: AnswerKey = serde_json::from_str(&raw)?;
        key.validate().map_err(KeyError::Invalid)?;
        Ok(key)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut letters: Vec<char> = self.weapon_letters.to_uppercase().chars().collect();
        let mut word: Vec<char> = self.weapon_word.to_uppercase().chars().collect();
        letters.sort_unstable();
        word.sort_unstable();
        if letters != word {
            return Err("weapon_letters is not an anagram of weapon_word".to_string());
        }
        if self.weapon_word.chars().count() > 6 {
            return Err("weapon_word must be at most 6 letters".to_string());
        }

        if self.timeline.len() != 5 {
            return Err(format!(
                "timeline needs exactly 5 events, found {}",
                self.timeline.len()
            ));
        }
        if !distinct(self.timeline.iter().map(|e| e.id.as_str())) {
            return Err("timeline event ids must be distinct".to_string());
        }

        if self.alibis.len() != 3 {
            return Err("exactly 3 alibi suspects are required".to_string());
        }
        if !distinct(self.alibis.iter().map(|s| s.id.as_str())) {
            return Err("alibi suspect ids must be distinct".to_string());
        }
        for suspect in &self.alibis {
            if !self.timeslots.contains(&suspect.timeslot) {
                return Err(format!(
                    "alibi timeslot '{}' for '{}' is not offered",
                    suspect.timeslot, suspect.id
                ));
            }
        }

        if !self.suspects.contains(&self.killer) {
            return Err(format!("killer '{}' is not in the suspect list", self.killer));
        }
        if !self.weapons.contains(&self.weapon_name) {
            return Err(format!(
                "weapon '{}' is not in the weapon list",
                self.weapon_name
            ));
        }

        if !distinct(self.contradictions.iter().map(|c| c.id.as_str())) {
            return Err("contradiction ids must be distinct".to_string());
        }
        let correct = self.contradictions.iter().filter(|c| c.correct).count();
        if self.contradictions.len() != 5 || correct != 3 {
            return Err("contradictions need 5 options with exactly 3 correct".to_string());
        }

        cipher::check_alphabet(&self.cipher_alphabet)?;

        if self.clue_keyword_threshold == 0
            || self.clue_keyword_threshold > self.clue_keywords.len()
        {
            return Err("clue_keyword_threshold out of range".to_string());
        }
        if self.hidden_clue_threshold == 0 || self.hidden_clue_threshold > self.hidden_clues.len()
        {
            return Err("hidden_clue_threshold out of range".to_string());
        }

        Ok(())
    }

    pub fn correct_contradictions(&self) -> HashSet<String> {
        self.contradictions
            .iter()
            .filter(|c| c.correct)
            .map(|c| c.id.to_uppercase())
            .collect()
    }

    pub fn alibi(&self, suspect_id: &str) -> Option<&AlibiSuspect> {
        self.alibis
            .iter()
            .find(|s| s.id.eq_ignore_ascii_case(suspect_id.trim()))
    }
}

/// Ids are matched case-insensitively, so they must differ ignoring case
fn distinct<'a>(ids: impl Iterator<Item = &'a str>) -> bool {
    let mut seen = HashSet::new();
    ids.map(|id| id.trim().to_uppercase()).all(|id| seen.insert(id))
}
