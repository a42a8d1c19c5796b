use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wire projection of a stored chat message, shared by the WebSocket
/// frames, the REST responses and the push notification payload.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MessageView {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_type: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}
