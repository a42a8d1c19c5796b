use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{ChatRoom, ChatRoomView};
use crate::services::message_service::MessageService;

const ROOM_COLUMNS: &str =
    "id, order_id, customer_id, delivery_partner_id, is_active, created_at, updated_at";

pub struct RoomService;

impl RoomService {
    pub async fn get_room(db: &PgPool, room_id: Uuid) -> Result<ChatRoom, AppError> {
        sqlx::query_as::<_, ChatRoom>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = $1"
        ))
        .bind(room_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotFound)
    }

    pub async fn find_by_order(db: &PgPool, order_id: Uuid) -> Result<Option<ChatRoom>, AppError> {
        let room = sqlx::query_as::<_, ChatRoom>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(db)
        .await?;
        Ok(room)
    }

    /// Return the order's room, creating it on first use. A room can only
    /// be created by one of the order's own parties, and only once the
    /// order has a delivery partner assigned; the parties are bound at
    /// creation time and never follow reassignment.
    ///
    /// Concurrent calls for the same order resolve through the UNIQUE
    /// constraint on chat_rooms.order_id: the loser of the insert race
    /// re-reads and returns the winner's row.
    pub async fn resolve_or_create(
        db: &PgPool,
        order_id: Uuid,
        requester: Uuid,
    ) -> Result<ChatRoom, AppError> {
        if let Some(room) = Self::find_by_order(db, order_id).await? {
            return Ok(room);
        }

        let customer_id: Uuid = sqlx::query_scalar("SELECT customer_id FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(db)
            .await?
            .ok_or(AppError::NotFound)?;

        let delivery_partner_id: Uuid = sqlx::query_scalar(
            "SELECT delivery_partner_id FROM delivery_assignments WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(db)
        .await?
        .ok_or(AppError::NotAssignedYet)?;

        // An outsider must not be able to materialize the room.
        if requester != customer_id && requester != delivery_partner_id {
            return Err(AppError::Forbidden);
        }

        let inserted = sqlx::query_as::<_, ChatRoom>(&format!(
            "INSERT INTO chat_rooms (id, order_id, customer_id, delivery_partner_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (order_id) DO NOTHING \
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(order_id)
        .bind(customer_id)
        .bind(delivery_partner_id)
        .fetch_optional(db)
        .await?;

        match inserted {
            Some(room) => Ok(room),
            // Lost the creation race; the winner's room must exist now.
            None => Self::find_by_order(db, order_id)
                .await?
                .ok_or(AppError::Internal),
        }
    }

    /// Active rooms the user is a party of, most recently updated first.
    pub async fn list_rooms_for_user(
        db: &PgPool,
        user_id: Uuid,
    ) -> Result<Vec<ChatRoom>, AppError> {
        let rooms = sqlx::query_as::<_, ChatRoom>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms \
             WHERE (customer_id = $1 OR delivery_partner_id = $1) AND is_active \
             ORDER BY updated_at DESC"
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rooms)
    }

    /// Build the REST view of a room for a given caller: display names,
    /// the caller's unread count and the latest message.
    pub async fn room_view(
        db: &PgPool,
        room: &ChatRoom,
        user_id: Uuid,
    ) -> Result<ChatRoomView, AppError> {
        let (order_number, customer_name, delivery_partner_name): (String, String, String) =
            sqlx::query_as(
                "SELECT o.order_number, cu.username, dp.username \
                 FROM orders o, users cu, users dp \
                 WHERE o.id = $1 AND cu.id = $2 AND dp.id = $3",
            )
            .bind(room.order_id)
            .bind(room.customer_id)
            .bind(room.delivery_partner_id)
            .fetch_one(db)
            .await?;

        let unread_count = MessageService::unread_count(db, room.id, user_id).await?;
        let last_message = MessageService::last_message(db, room.id).await?;

        Ok(ChatRoomView {
            id: room.id,
            order_id: room.order_id,
            order_number,
            customer_id: room.customer_id,
            customer_name,
            delivery_partner_id: room.delivery_partner_id,
            delivery_partner_name,
            is_active: room.is_active,
            created_at: room.created_at,
            updated_at: room.updated_at,
            unread_count,
            last_message,
        })
    }
}
