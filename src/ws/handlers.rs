//! WebSocket message dispatch
//!
//! Each client message is handled to completion before the next one is read,
//! so a session never sees two violations in flight.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Screen;
use std::sync::Arc;

use super::game::{self, locked};
use super::lockdown;
use super::session::{Outbound, Session};

/// First messages on a fresh connection
pub async fn welcome(session: &Session) -> Vec<Outbound> {
    let locked_now = session.guard.is_locked().await;
    let identity = if locked_now {
        None
    } else {
        session.guard.remembered_identity().await
    };

    let mut out = vec![ServerMessage::Welcome {
        session_id: session.id.to_string(),
        device_id: session.guard.device().to_string(),
        locked: locked_now,
        identity,
    }
    .into()];
    if locked_now {
        out.push(locked());
    } else {
        out.push(
            ServerMessage::Screen {
                screen: Screen::Identity,
            }
            .into(),
        );
    }
    out
}

/// Handle one client message and return the replies, in order
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &Arc<AppState>,
) -> Vec<Outbound> {
    match msg {
        ClientMessage::EnterIdentity {
            player_name,
            team_id,
        } => game::handle_enter_identity(state, session, &player_name, &team_id).await,

        ClientMessage::Navigate { screen } => game::handle_navigate(state, session, screen).await,

        ClientMessage::Submit { answer } => game::handle_submit(state, session, answer).await,

        ClientMessage::Reset => game::handle_reset(state, session).await,

        ClientMessage::RequestLeaderboard { limit } => {
            game::handle_request_leaderboard(state, limit).await
        }

        // Anti-cheat
        ClientMessage::StartGame => lockdown::handle_start_game(session).await,

        ClientMessage::Violation { kind } => lockdown::handle_violation(session, kind).await,

        ClientMessage::KeyPress { key } => lockdown::handle_key_press(session, &key).await,

        ClientMessage::AdminUnlock { pin } => lockdown::handle_admin_unlock(session, pin).await,
    }
}
