use serde::{Deserialize, Serialize};

/// In-session anti-cheat phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Inactive,
    Active,
    Warned,
    /// Terminal for the session
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    VisibilityLost,
    FullscreenExit,
    ForbiddenShortcut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationOutcome {
    /// Not watching (game not started, or already locked)
    Ignored,
    Warn { restore_fullscreen: bool },
    Lock,
}

/// Two-strike counter. The second violation of any kind locks.
#[derive(Debug, Clone, Default)]
pub struct SessionLock {
    phase: SessionPhase,
}

impl SessionLock {
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Begin watching; returns false if the session was already past `Inactive`
    pub fn start(&mut self) -> bool {
        if self.phase != SessionPhase::Inactive {
            return false;
        }
        self.phase = SessionPhase::Active;
        true
    }

    pub fn record(&mut self, kind: ViolationKind) -> ViolationOutcome {
        match self.phase {
            SessionPhase::Inactive | SessionPhase::Locked => ViolationOutcome::Ignored,
            SessionPhase::Active => {
                self.phase = SessionPhase::Warned;
                ViolationOutcome::Warn {
                    restore_fullscreen: kind == ViolationKind::FullscreenExit,
                }
            }
            SessionPhase::Warned => {
                self.phase = SessionPhase::Locked;
                ViolationOutcome::Lock
            }
        }
    }
}
