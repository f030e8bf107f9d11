use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of puzzles in a play-through
pub const PUZZLE_COUNT: usize = 9;

/// Epoch milliseconds
pub type Millis = i64;

pub fn now_ms() -> Millis {
    chrono::Utc::now().timestamp_millis()
}

/// Natural key of a play-through: (player name, team id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub player_name: String,
    pub team_id: String,
}

impl Identity {
    /// Normalize raw form input. Both parts are trimmed and the team id is
    /// upper-cased. Returns None if either part ends up empty.
    pub fn new(player_name: &str, team_id: &str) -> Option<Self> {
        let player_name = player_name.trim();
        let team_id = team_id.trim().to_uppercase();
        if player_name.is_empty() || team_id.is_empty() {
            return None;
        }
        Some(Self {
            player_name: player_name.to_string(),
            team_id,
        })
    }

    /// Display form of the key, `"<TEAM>_<player>"`. Not unique when either
    /// part contains `_`; stores key on the `Identity` itself.
    pub fn storage_key(&self) -> String {
        format!("{}_{}", self.team_id, self.player_name)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.player_name, self.team_id)
    }
}

/// 1-based puzzle index, always in `1..=9`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PuzzleId(u8);

impl PuzzleId {
    pub const FIRST: PuzzleId = PuzzleId(1);
    pub const LAST: PuzzleId = PuzzleId(PUZZLE_COUNT as u8);

    /// Construct from a literal index; panics outside `1..=9`
    pub const fn of(n: u8) -> Self {
        assert!(n >= 1 && n <= PUZZLE_COUNT as u8, "puzzle index out of range");
        Self(n)
    }

    pub fn new(n: u8) -> Option<Self> {
        (1..=PUZZLE_COUNT as u8).contains(&n).then_some(Self(n))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position in the flag array
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1)
    }

    pub fn previous(self) -> Option<Self> {
        Self::new(self.0.wrapping_sub(1))
    }

    pub fn all() -> impl Iterator<Item = PuzzleId> {
        (1..=PUZZLE_COUNT as u8).map(PuzzleId)
    }

    pub fn title(self) -> &'static str {
        match self.0 {
            1 => "The Weapon",
            2 => "The Timeline",
            3 => "The Alibis",
            4 => "The Deduction",
            5 => "The Contradictions",
            6 => "The Ledger Query",
            7 => "The Cipher",
            8 => "The Inspection",
            _ => "The Accusation",
        }
    }
}

impl TryFrom<u8> for PuzzleId {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        PuzzleId::new(n).ok_or_else(|| format!("puzzle index {} out of range 1..=9", n))
    }
}

impl From<PuzzleId> for u8 {
    fn from(id: PuzzleId) -> u8 {
        id.0
    }
}

impl fmt::Display for PuzzleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "puzzle {}", self.0)
    }
}

/// Persisted game state for one player-team pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub player_name: String,
    pub team_id: String,
    /// Completion flags, index 0 is puzzle 1
    pub solved: [bool; PUZZLE_COUNT],
    #[serde(default)]
    pub weapon: String,
    #[serde(default)]
    pub killer: String,
    /// Furthest puzzle reached; only ever advances
    #[serde(default)]
    pub current_page: u8,
    pub start_time: Millis,
    /// Elapsed milliseconds, see `CompletionPolicy`
    #[serde(default)]
    pub completion_time: Option<Millis>,
    #[serde(default)]
    pub updated_at: Millis,
}

impl ProgressRecord {
    /// Fresh record for a pair seen for the first time
    pub fn fresh(identity: &Identity, now: Millis) -> Self {
        Self {
            player_name: identity.player_name.clone(),
            team_id: identity.team_id.clone(),
            solved: [false; PUZZLE_COUNT],
            weapon: String::new(),
            killer: String::new(),
            current_page: 0,
            start_time: now,
            completion_time: None,
            updated_at: now,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            player_name: self.player_name.clone(),
            team_id: self.team_id.clone(),
        }
    }

    pub fn is_solved(&self, puzzle: PuzzleId) -> bool {
        self.solved[puzzle.index()]
    }

    pub fn solved_count(&self) -> u8 {
        self.solved.iter().filter(|s| **s).count() as u8
    }

    pub fn is_complete(&self) -> bool {
        self.solved.iter().all(|s| *s)
    }

    /// First puzzle in order whose flag is still false
    pub fn first_unsolved(&self) -> Option<PuzzleId> {
        PuzzleId::all().find(|p| !self.is_solved(*p))
    }

    /// Reconcile an incoming write with what is already stored.
    ///
    /// Flags are or-merged and `current_page` max-merged so a stale writer can
    /// never regress progress. `start_time` always comes from the stored copy.
    pub fn merge_onto(mut self, stored: &ProgressRecord) -> ProgressRecord {
        for (flag, prior) in self.solved.iter_mut().zip(stored.solved.iter()) {
            *flag |= *prior;
        }
        self.current_page = self.current_page.max(stored.current_page);
        self.start_time = stored.start_time;
        if self.weapon.is_empty() {
            self.weapon = stored.weapon.clone();
        }
        if self.killer.is_empty() {
            self.killer = stored.killer.clone();
        }
        if self.completion_time.is_none() {
            self.completion_time = stored.completion_time;
        }
        self
    }
}

/// Denormalized leaderboard projection of a `ProgressRecord`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub team_id: String,
    pub puzzles_completed: u8,
    /// Elapsed milliseconds, 0 while incomplete
    pub completion_time: Millis,
    pub is_complete: bool,
    pub updated_at: Millis,
}

impl From<&ProgressRecord> for LeaderboardEntry {
    fn from(record: &ProgressRecord) -> Self {
        let is_complete = record.is_complete();
        Self {
            player_name: record.player_name.clone(),
            team_id: record.team_id.clone(),
            puzzles_completed: record.solved_count(),
            completion_time: if is_complete {
                record.completion_time.unwrap_or(0)
            } else {
                0
            },
            is_complete,
            updated_at: record.updated_at,
        }
    }
}

impl LeaderboardEntry {
    pub fn identity(&self) -> Identity {
        Identity {
            player_name: self.player_name.clone(),
            team_id: self.team_id.clone(),
        }
    }
}

/// Screens the UI layer can be told to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "puzzle", rename_all = "snake_case")]
pub enum Screen {
    Identity,
    Puzzle(PuzzleId),
    Results,
}

/// When `completion_time` gets stamped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionPolicy {
    /// Stamped once, when puzzle 9 is solved
    FinalOnly,
    /// Puzzle 3 stamps a rolling checkpoint that puzzle 9 replaces.
    /// Matches how the room has always timed players.
    #[default]
    Checkpoint,
}

impl std::str::FromStr for CompletionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "final_only" | "final" => Ok(Self::FinalOnly),
            "checkpoint" | "legacy" => Ok(Self::Checkpoint),
            other => Err(format!("unknown completion policy '{}'", other)),
        }
    }
}
