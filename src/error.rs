use crate::store::StoreError;
use crate::types::Screen;

pub type GameResult<T> = Result<T, GameError>;

/// Errors surfaced by the progression layer
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Answer did not satisfy the puzzle; always retryable
    #[error("{hint}")]
    ValidationRejected { hint: String },

    #[error("Player name and team are required")]
    MissingIdentity,

    #[error("Puzzle not unlocked yet")]
    PrerequisiteIncomplete { redirect: Screen },

    #[error("Progress could not be saved: {0}")]
    Storage(#[from] StoreError),

    #[error("This device has already completed the game")]
    DeviceLocked,
}

impl GameError {
    pub fn rejected(hint: impl Into<String>) -> Self {
        Self::ValidationRejected { hint: hint.into() }
    }

    /// Wire code sent to the client
    pub fn code(&self) -> &'static str {
        match self {
            Self::ValidationRejected { .. } => "VALIDATION_REJECTED",
            Self::MissingIdentity => "MISSING_IDENTITY",
            Self::PrerequisiteIncomplete { .. } => "PREREQUISITE_INCOMPLETE",
            Self::Storage(_) => "STORAGE_FAILURE",
            Self::DeviceLocked => "DEVICE_LOCKED",
        }
    }
}

/// Failures while building the application state at startup
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("answer key: {0}")]
    AnswerKey(#[from] crate::puzzles::KeyError),

    #[error("store: {0}")]
    Store(#[from] StoreError),
}
