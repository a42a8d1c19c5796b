//! Connection gateway for the chat socket. A connection moves through
//! Connecting -> Authenticating -> Authorizing -> Joined -> Closed; any
//! failure before Joined refuses the handshake, and every exit path
//! deregisters the session from the broadcast hub.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::HeaderMap,
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth;
use crate::models::ChatRoom;
use crate::services::{message_service::MessageService, room_service::RoomService};
use crate::state::AppState;
use crate::websocket::broadcast_frame;
use crate::websocket::message_types::{ClientFrame, ServerFrame};

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// GET /ws/chat/{room_id}?token=...
pub async fn ws_handler(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    // Connecting: a bearer credential must be present in the handshake.
    let token = params
        .token
        .or_else(|| auth::bearer_token(&headers))
        .ok_or(AppError::Unauthorized)?;

    // Authenticating
    let user_id = auth::authenticate(&token, &state.config.jwt_secret)?;

    // Authorizing
    let room = RoomService::get_room(&state.db, room_id).await?;
    if !room.is_party(user_id) {
        warn!(%user_id, %room_id, "websocket rejected: not a party to the room");
        return Err(AppError::Forbidden);
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(state, room, user_id, socket)))
}

async fn handle_socket(state: AppState, room: ChatRoom, user_id: Uuid, socket: WebSocket) {
    let room_id = room.id;
    let (mut sender, mut receiver) = socket.split();

    // Joined: register before the history read so a message committed
    // between the two is seen either in the replay or on the live channel.
    let (session_id, mut rx) = state.registry.join(room_id).await;

    let replay_sent = match MessageService::history(&state.db, room_id, state.config.history_limit)
        .await
    {
        Ok(messages) => {
            let frame = ServerFrame::MessageHistory { messages };
            match serde_json::to_string(&frame) {
                Ok(payload) => sender.send(Message::Text(payload)).await.is_ok(),
                Err(e) => {
                    warn!(error = %e, %room_id, "failed to serialize history frame");
                    false
                }
            }
        }
        Err(e) => {
            warn!(error = %e, %room_id, "failed to load history for new session");
            false
        }
    };

    if replay_sent {
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(msg) => {
                            if sender.send(msg).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                incoming = receiver.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) => {
                            handle_client_frame(&state, &room, user_id, &text).await;
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        // Ping/Pong are answered by the framework.
                        Some(Ok(_)) => {}
                    }
                }
            }
        }
    }

    // Closed: always deregister, whatever path got us here.
    state.registry.leave(room_id, session_id).await;
    debug!(%user_id, %room_id, "chat session closed");
}

/// One inbound client frame. Malformed payloads are dropped without
/// closing the connection; store failures end only the current operation.
async fn handle_client_frame(state: &AppState, room: &ChatRoom, user_id: Uuid, text: &str) {
    let frame = match serde_json::from_str::<ClientFrame>(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, %user_id, "ignoring malformed chat frame");
            return;
        }
    };

    match frame {
        ClientFrame::ChatMessage { message } => {
            let view = match MessageService::append(&state.db, room.id, user_id, &message).await {
                Ok(view) => view,
                // Whitespace-only input is a silent no-op on the socket.
                Err(AppError::EmptyMessage) => return,
                Err(e) => {
                    warn!(error = %e, room_id = %room.id, "failed to persist chat message");
                    return;
                }
            };

            broadcast_frame(
                &state.registry,
                &state.publisher,
                room.id,
                &ServerFrame::ChatMessage { message: view },
            )
            .await;
        }
        ClientFrame::ReadReceipt => {
            match MessageService::mark_all_read(&state.db, room.id, user_id).await {
                Ok(_updated) => {
                    broadcast_frame(
                        &state.registry,
                        &state.publisher,
                        room.id,
                        &ServerFrame::ReadReceipt {
                            user_id,
                            room_id: room.id,
                        },
                    )
                    .await;
                }
                Err(e) => {
                    warn!(error = %e, room_id = %room.id, "failed to mark messages read");
                }
            }
        }
    }
}
