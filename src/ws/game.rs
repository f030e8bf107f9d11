//! Play-through handlers: identity, navigation, answers, reset

use crate::error::GameError;
use crate::progress::{self, enter, resolve_entry_point, Entry, RedirectReason, Submission};
use crate::protocol::ServerMessage;
use crate::puzzles::Answer;
use crate::state::AppState;
use crate::store::LeaderboardSync;
use crate::types::{now_ms, Identity, Screen};
use std::sync::Arc;

use super::session::{Outbound, Session};

pub(super) fn locked() -> Outbound {
    ServerMessage::Locked {
        msg: GameError::DeviceLocked.to_string(),
    }
    .into()
}

fn error(e: &GameError) -> Vec<Outbound> {
    vec![ServerMessage::from(e).into()]
}

/// Messages that put `screen` in front of the player
pub(super) fn show(state: &AppState, session: &Session, screen: Screen) -> Vec<Outbound> {
    let identity_screen = || {
        vec![ServerMessage::Screen {
            screen: Screen::Identity,
        }
        .into()]
    };
    match screen {
        Screen::Identity => identity_screen(),
        Screen::Puzzle(puzzle) => match session.identity() {
            Some(identity) => vec![
                ServerMessage::Screen { screen }.into(),
                ServerMessage::Puzzle {
                    briefing: state.briefing(puzzle, &identity, &session.stages),
                }
                .into(),
            ],
            None => identity_screen(),
        },
        Screen::Results => match &session.record {
            Some(record) => vec![
                ServerMessage::Screen { screen }.into(),
                ServerMessage::Results {
                    record: record.clone(),
                }
                .into(),
            ],
            None => identity_screen(),
        },
    }
}

fn redirect(state: &AppState, session: &Session, to: Screen, reason: RedirectReason) -> Vec<Outbound> {
    let mut out = vec![ServerMessage::Redirect { to, reason }.into()];
    out.extend(show(state, session, to));
    out
}

fn apply_entry(state: &AppState, session: &Session, entry: Entry) -> Vec<Outbound> {
    match entry {
        Entry::Show(screen) => show(state, session, screen),
        Entry::Redirect { to, reason } => redirect(state, session, to, reason),
    }
}

pub async fn handle_enter_identity(
    state: &Arc<AppState>,
    session: &mut Session,
    player_name: &str,
    team_id: &str,
) -> Vec<Outbound> {
    if session.guard.is_locked().await {
        return vec![locked()];
    }
    let Some(identity) = Identity::new(player_name, team_id) else {
        return error(&GameError::MissingIdentity);
    };

    let record = match state.start(&identity).await {
        Ok(record) => record,
        Err(e) => {
            tracing::error!(player = %identity, error = %e, "Failed to start play-through");
            return error(&e);
        }
    };

    if session.identity().as_ref() != Some(&identity) {
        session.clear_player();
    }
    if let Err(e) = session.guard.remember_identity(&identity).await {
        tracing::warn!(error = %e, "Failed to cache identity on device");
    }

    let screen = resolve_entry_point(&record);
    session.record = Some(record);
    show(state, session, screen)
}

pub async fn handle_navigate(state: &Arc<AppState>, session: &mut Session, screen: Screen) -> Vec<Outbound> {
    if session.guard.is_locked().await {
        // The player who just finished may still look at their results
        let own_results = screen == Screen::Results
            && session.record.as_ref().is_some_and(|r| r.is_complete());
        if !own_results {
            return vec![locked()];
        }
    }

    // Pick up progress made from another session
    if let Some(identity) = session.identity() {
        match state.load(&identity).await {
            Ok(Some(stored)) => session.record = Some(stored),
            Ok(None) => {
                tracing::info!(player = %identity, "Record gone, back to identity entry");
                session.clear_player();
            }
            Err(e) => tracing::warn!(error = %e, "Reload failed, using session copy"),
        }
    }

    apply_entry(state, session, enter(screen, session.record.as_ref()))
}

pub async fn handle_submit(state: &Arc<AppState>, session: &mut Session, answer: Answer) -> Vec<Outbound> {
    if session.guard.is_locked().await {
        return vec![locked()];
    }
    let Some(record) = session.record.clone() else {
        return redirect(state, session, Screen::Identity, RedirectReason::MissingIdentity);
    };
    let puzzle = answer.puzzle();

    let outcome = progress::submit(
        &record,
        &session.stages,
        &answer,
        &state.key,
        state.config.completion_policy,
        now_ms(),
    );

    match outcome {
        Err(GameError::PrerequisiteIncomplete { redirect: to }) => {
            redirect(state, session, to, RedirectReason::PrerequisiteIncomplete)
        }
        Err(GameError::ValidationRejected { hint }) => {
            tracing::debug!(player = %record.identity(), %puzzle, "Answer rejected");
            vec![ServerMessage::Rejected { puzzle, hint }.into()]
        }
        Err(e) => error(&e),
        Ok(Submission::StageCleared(stage)) => {
            session.stages.apply(&stage);
            let briefing = state.briefing(puzzle, &record.identity(), &session.stages);
            vec![
                ServerMessage::StageCleared { stage }.into(),
                ServerMessage::Puzzle { briefing }.into(),
            ]
        }
        Ok(Submission::AlreadySolved { next }) => {
            redirect(state, session, next, RedirectReason::AlreadySolved)
        }
        Ok(Submission::Advanced { record: next_record, next }) => {
            // Not accepted until the store confirms the write
            let (saved, sync) = match state.commit(next_record).await {
                Ok(saved) => saved,
                Err(e) => {
                    tracing::error!(player = %record.identity(), %puzzle, error = %e, "Failed to save solve");
                    return error(&e);
                }
            };
            tracing::info!(player = %saved.identity(), %puzzle, solved = saved.solved_count(), "Puzzle solved");

            let complete = saved.is_complete();
            session.record = Some(saved.clone());
            let mut out = vec![ServerMessage::Accepted {
                puzzle,
                next,
                record: saved,
                leaderboard_synced: sync == LeaderboardSync::Synced,
            }
            .into()];

            if complete {
                if let Err(e) = session.guard.mark_completed().await {
                    tracing::error!(error = %e, "Failed to lock device after completion");
                }
            }
            out.extend(apply_entry(state, session, enter(next, session.record.as_ref())));
            out
        }
    }
}

pub async fn handle_reset(state: &Arc<AppState>, session: &mut Session) -> Vec<Outbound> {
    if let Some(identity) = session.identity() {
        if let Err(e) = state.reset(&identity).await {
            tracing::error!(player = %identity, error = %e, "Failed to reset progress");
            return error(&e);
        }
    }
    session.clear_player();
    if let Err(e) = session.guard.forget_identity().await {
        tracing::warn!(error = %e, "Failed to clear cached identity");
    }

    let mut out = show(state, session, Screen::Identity);
    if session.guard.is_locked().await {
        out.push(locked());
    }
    out
}

pub async fn handle_request_leaderboard(state: &Arc<AppState>, limit: Option<usize>) -> Vec<Outbound> {
    match state.leaderboard(limit).await {
        Ok(entries) => vec![ServerMessage::Leaderboard { entries }.into()],
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read leaderboard");
            error(&e)
        }
    }
}
