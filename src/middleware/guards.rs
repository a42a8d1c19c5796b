//! Authorization guards that enforce permission checks at the type level
//! so handlers cannot accidentally skip them.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ChatRoom;
use crate::services::room_service::RoomService;

/// The authenticated caller, extracted from the user id the auth
/// middleware placed in the request extensions.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .extensions
            .get::<Uuid>()
            .cloned()
            .ok_or(AppError::Unauthorized)?;

        Ok(AuthUser { id: user_id })
    }
}

/// A verified room party: the user is the room's customer or its delivery
/// partner. Every room-scoped operation goes through this guard.
#[derive(Debug, Clone)]
pub struct RoomParty {
    pub user_id: Uuid,
    pub room: ChatRoom,
}

impl RoomParty {
    pub async fn verify(db: &PgPool, user_id: Uuid, room_id: Uuid) -> Result<Self, AppError> {
        let room = RoomService::get_room(db, room_id).await?;

        if !room.is_party(user_id) {
            return Err(AppError::Forbidden);
        }

        Ok(RoomParty { user_id, room })
    }
}
