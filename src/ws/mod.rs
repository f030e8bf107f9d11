mod game;
pub mod handlers;
mod lockdown;
pub mod session;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::lock::device_tag;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use session::{Outbound, Session};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Stable id the client keeps in local storage
    pub device: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let device = params
        .device
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| ulid::Ulid::new().to_string());
    tracing::info!(device = %device_tag(&device), "WebSocket connection request");

    ws.on_upgrade(move |socket| handle_socket(socket, device, state))
}

async fn send(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

/// Send immediate replies; delayed ones go into `pending`
async fn dispatch(
    sender: &mut SplitSink<WebSocket, Message>,
    pending: &mut JoinSet<ServerMessage>,
    replies: Vec<Outbound>,
) -> bool {
    for reply in replies {
        match reply {
            Outbound::Now(msg) => {
                if !send(sender, &msg).await {
                    return false;
                }
            }
            Outbound::After(delay, msg) => {
                pending.spawn(async move {
                    tokio::time::sleep(delay).await;
                    msg
                });
            }
        }
    }
    true
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, device: String, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::new(&state, &device);
    let tag = device_tag(&device);
    tracing::info!(session = %session.id, device = %tag, "WebSocket connected");

    // Deferred messages; dropped (and aborted) with the connection
    let mut pending: JoinSet<ServerMessage> = JoinSet::new();

    let welcome = handlers::welcome(&session).await;
    if !dispatch(&mut sender, &mut pending, welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let mut leaderboard_rx = state.leaderboard_broadcast.subscribe();

    loop {
        tokio::select! {
            // Live leaderboard pushes
            broadcast_msg = leaderboard_rx.recv() => {
                if let Ok(msg) = broadcast_msg {
                    if !send(&mut sender, &msg).await {
                        break;
                    }
                }
            }

            // Deferred fullscreen retries and lock redirects
            Some(joined) = pending.join_next(), if !pending.is_empty() => {
                if let Ok(msg) = joined {
                    if !send(&mut sender, &msg).await {
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(session = %session.id, "Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                let replies =
                                    handlers::handle_message(client_msg, &mut session, &state).await;
                                if !dispatch(&mut sender, &mut pending, replies).await {
                                    tracing::error!("Failed to send response");
                                    break;
                                }
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                let error = ServerMessage::error(
                                    "PARSE_ERROR",
                                    format!("Invalid message format: {}", e),
                                );
                                let _ = send(&mut sender, &error).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(session = %session.id, device = %tag, "WebSocket connection closed");
}
