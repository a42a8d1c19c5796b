use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::message::MessageView;

/// A chat room bound to exactly one order. The (customer, delivery_partner)
/// pair is fixed when the room is created; reassigning the order's delivery
/// partner later does not retarget the room.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatRoom {
    pub id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub delivery_partner_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatRoom {
    /// True iff the user is one of the room's two parties. Nobody else,
    /// including admins, may touch the room.
    pub fn is_party(&self, user_id: Uuid) -> bool {
        user_id == self.customer_id || user_id == self.delivery_partner_id
    }

    /// The other party of the room relative to `user_id`.
    pub fn counterparty(&self, user_id: Uuid) -> Uuid {
        if user_id == self.customer_id {
            self.delivery_partner_id
        } else {
            self.customer_id
        }
    }
}

/// Room detail as served over REST: the raw room plus display names,
/// the caller's unread count and the latest message.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRoomView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub delivery_partner_id: Uuid,
    pub delivery_partner_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub unread_count: i64,
    pub last_message: Option<MessageView>,
}
