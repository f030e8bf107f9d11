//! Anti-cheat and device unlock handlers

use crate::error::GameError;
use crate::lock::{KeyCombo, KeyOutcome, UnlockCode, ViolationKind, ViolationOutcome};
use crate::progress::RedirectReason;
use crate::protocol::ServerMessage;
use crate::types::Screen;

use super::game::locked;
use super::session::{Outbound, Session};

fn storage_error(e: crate::store::StoreError) -> Outbound {
    ServerMessage::from(&GameError::Storage(e)).into()
}

fn respond(session: &mut Session, kind: ViolationKind, outcome: ViolationOutcome) -> Vec<Outbound> {
    match outcome {
        ViolationOutcome::Ignored => vec![],
        ViolationOutcome::Warn { restore_fullscreen } => {
            let mut out = vec![ServerMessage::LockWarning {
                violation: kind,
                msg: "Stay in the game. Leaving again will lock this device.".to_string(),
            }
            .into()];
            if restore_fullscreen {
                out.push(Outbound::After(
                    session.guard.policy().fullscreen_retry,
                    ServerMessage::RestoreFullscreen,
                ));
            }
            out
        }
        ViolationOutcome::Lock => {
            session.clear_player();
            vec![
                locked(),
                Outbound::After(
                    session.guard.policy().lock_redirect,
                    ServerMessage::Redirect {
                        to: Screen::Identity,
                        reason: RedirectReason::DeviceLocked,
                    },
                ),
            ]
        }
    }
}

pub async fn handle_start_game(session: &mut Session) -> Vec<Outbound> {
    match session.guard.start_game().await {
        Ok(true) => vec![],
        Ok(false) if session.guard.is_locked().await => vec![locked()],
        Ok(false) => vec![],
        Err(e) => {
            tracing::warn!(error = %e, "Failed to mark active session");
            vec![]
        }
    }
}

pub async fn handle_violation(session: &mut Session, kind: ViolationKind) -> Vec<Outbound> {
    match session.guard.record_violation(kind).await {
        Ok(outcome) => respond(session, kind, outcome),
        Err(e) => {
            // Only the locking transition writes; the session is locked regardless
            tracing::error!(error = %e, "Failed to persist device lock");
            let mut out = respond(session, kind, ViolationOutcome::Lock);
            out.push(storage_error(e));
            out
        }
    }
}

pub async fn handle_key_press(session: &mut Session, key: &KeyCombo) -> Vec<Outbound> {
    match session.guard.push_key(key).await {
        Ok(KeyOutcome::Ignored) => vec![],
        Ok(KeyOutcome::Unlocked) => vec![ServerMessage::Unlocked.into()],
        Ok(KeyOutcome::Violation(outcome)) => {
            respond(session, ViolationKind::ForbiddenShortcut, outcome)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to update device flags");
            vec![storage_error(e)]
        }
    }
}

pub async fn handle_admin_unlock(session: &mut Session, pin: String) -> Vec<Outbound> {
    match session.guard.unlock(&UnlockCode::Pin(pin)).await {
        Ok(true) => vec![ServerMessage::Unlocked.into()],
        Ok(false) => vec![ServerMessage::error("UNLOCK_REFUSED", "Incorrect PIN").into()],
        Err(e) => {
            tracing::error!(error = %e, "Failed to clear device lock");
            vec![storage_error(e)]
        }
    }
}
