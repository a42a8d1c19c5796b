use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::guards::{AuthUser, RoomParty};
use crate::models::MessageView;
use crate::services::message_service::MessageService;
use crate::state::AppState;
use crate::websocket::{broadcast_frame, message_types::ServerFrame};

/// GET /api/v1/chat/rooms/{id}/messages
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<Vec<MessageView>>> {
    let party = RoomParty::verify(&state.db, user.id, room_id).await?;
    let messages = MessageService::full_history(&state.db, party.room.id).await?;
    Ok(Json(messages))
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// POST /api/v1/chat/rooms/{id}/messages
///
/// Same path as the real-time send: persist, then fan out. Additionally
/// hands the message to the notification bridge for the counterparty.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<MessageView>)> {
    let party = RoomParty::verify(&state.db, user.id, room_id).await?;

    let view = MessageService::append(&state.db, party.room.id, user.id, &body.message).await?;

    broadcast_frame(
        &state.registry,
        &state.publisher,
        party.room.id,
        &ServerFrame::ChatMessage {
            message: view.clone(),
        },
    )
    .await;

    let recipient = party.room.counterparty(user.id);
    state
        .notifier
        .notify_new_message(state.db.clone(), recipient, party.room.id, view.clone());

    Ok((StatusCode::CREATED, Json(view)))
}
