use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::guards::{AuthUser, RoomParty};
use crate::models::ChatRoomView;
use crate::services::room_service::RoomService;
use crate::state::AppState;

/// GET /api/v1/chat/rooms
pub async fn list_rooms(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<ChatRoomView>>> {
    let rooms = RoomService::list_rooms_for_user(&state.db, user.id).await?;

    let mut views = Vec::with_capacity(rooms.len());
    for room in &rooms {
        views.push(RoomService::room_view(&state.db, room, user.id).await?);
    }
    Ok(Json(views))
}

/// GET /api/v1/chat/rooms/{id}
pub async fn get_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<ChatRoomView>> {
    let party = RoomParty::verify(&state.db, user.id, room_id).await?;
    let view = RoomService::room_view(&state.db, &party.room, user.id).await?;
    Ok(Json(view))
}

/// GET /api/v1/chat/orders/{order_id}/room
///
/// Get-or-create the order's room. Creation requires a current delivery
/// assignment and is restricted to the order's parties before anything
/// is written; the existing-room path re-checks membership here.
pub async fn get_or_create_room(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ChatRoomView>> {
    let room = RoomService::resolve_or_create(&state.db, order_id, user.id).await?;

    if !room.is_party(user.id) {
        return Err(AppError::Forbidden);
    }

    let view = RoomService::room_view(&state.db, &room, user.id).await?;
    Ok(Json(view))
}

#[derive(Serialize)]
pub struct MarkReadResponse {
    pub updated: u64,
}

/// POST /api/v1/chat/rooms/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(room_id): Path<Uuid>,
) -> AppResult<Json<MarkReadResponse>> {
    let party = RoomParty::verify(&state.db, user.id, room_id).await?;

    let updated = crate::services::message_service::MessageService::mark_all_read(
        &state.db,
        party.room.id,
        user.id,
    )
    .await?;

    Ok(Json(MarkReadResponse { updated }))
}
