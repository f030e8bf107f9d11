use crate::lock::DeviceLockGuard;
use crate::protocol::ServerMessage;
use crate::puzzles::PuzzleStages;
use crate::state::AppState;
use crate::types::{Identity, ProgressRecord};
use std::time::Duration;
use ulid::Ulid;

/// Per-connection state. Dropped with the socket.
pub struct Session {
    pub id: Ulid,
    pub guard: DeviceLockGuard,
    /// Last record confirmed by the store
    pub record: Option<ProgressRecord>,
    pub stages: PuzzleStages,
}

impl Session {
    pub fn new(state: &AppState, device: &str) -> Self {
        Self {
            id: Ulid::new(),
            guard: state.lock_guard(device),
            record: None,
            stages: PuzzleStages::default(),
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.record.as_ref().map(ProgressRecord::identity)
    }

    /// Drop the player; stage scratch goes with them
    pub fn clear_player(&mut self) {
        self.record = None;
        self.stages = PuzzleStages::default();
    }
}

/// A reply for the client, either right away or after a delay
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Now(ServerMessage),
    After(Duration, ServerMessage),
}

impl From<ServerMessage> for Outbound {
    fn from(msg: ServerMessage) -> Self {
        Outbound::Now(msg)
    }
}
