use crate::protocol::ServerMessage;
use crate::state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

/// Entries pushed with each live update
const LIVE_LEADERBOARD_SIZE: usize = 10;

/// Spawn a background task that turns store changes into ranked leaderboard
/// pushes for every connected session
pub fn spawn_leaderboard_broadcaster(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let mut events = state.store.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => tracing::trace!(?event, "Store changed"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Leaderboard broadcaster lagged");
                }
                Err(RecvError::Closed) => break,
            }

            // Coalesce bursts into one push
            tokio::time::sleep(Duration::from_millis(100)).await;
            loop {
                match events.try_recv() {
                    Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }

            match state.leaderboard(Some(LIVE_LEADERBOARD_SIZE)).await {
                Ok(entries) => {
                    // Ignore send errors (no sessions connected is fine)
                    let _ = state
                        .leaderboard_broadcast
                        .send(ServerMessage::Leaderboard { entries });
                }
                Err(e) => tracing::warn!(error = %e, "Failed to rank leaderboard"),
            }
        }
        tracing::debug!("Leaderboard broadcaster stopped");
    })
}
