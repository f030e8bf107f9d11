use crate::lock::{KeyCombo, ViolationKind};
use crate::progress::RedirectReason;
use crate::puzzles::{Answer, Briefing, Stage};
use crate::types::{Identity, LeaderboardEntry, ProgressRecord, PuzzleId, Screen};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start or continue a play-through
    EnterIdentity {
        player_name: String,
        team_id: String,
    },
    Navigate {
        screen: Screen,
    },
    Submit {
        answer: Answer,
    },
    /// Fullscreen entered; anti-cheat listeners armed
    StartGame,
    Violation {
        kind: ViolationKind,
    },
    KeyPress {
        key: KeyCombo,
    },
    AdminUnlock {
        pin: String,
    },
    /// "Play again": delete the current record
    Reset,
    RequestLeaderboard {
        #[serde(default)]
        limit: Option<usize>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        session_id: String,
        /// Echoed back so a client without one can persist it
        device_id: String,
        locked: bool,
        /// Identity cached on this device, for "continue"
        identity: Option<Identity>,
    },
    Screen {
        screen: Screen,
    },
    Redirect {
        to: Screen,
        reason: RedirectReason,
    },
    Puzzle {
        briefing: Briefing,
    },
    Accepted {
        puzzle: PuzzleId,
        next: Screen,
        record: ProgressRecord,
        /// False when the leaderboard entry is queued for resync
        leaderboard_synced: bool,
    },
    StageCleared {
        stage: Stage,
    },
    Rejected {
        puzzle: PuzzleId,
        hint: String,
    },
    Results {
        record: ProgressRecord,
    },
    Locked {
        msg: String,
    },
    LockWarning {
        violation: ViolationKind,
        msg: String,
    },
    RestoreFullscreen,
    Unlocked,
    Leaderboard {
        entries: Vec<LeaderboardEntry>,
    },
    Error {
        code: String,
        msg: String,
    },
}

impl ServerMessage {
    pub fn error(code: &str, msg: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            msg: msg.into(),
        }
    }
}

impl From<&crate::error::GameError> for ServerMessage {
    fn from(e: &crate::error::GameError) -> Self {
        Self::error(e.code(), e.to_string())
    }
}
