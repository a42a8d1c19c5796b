use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::MessageView;

/// Frames a client may send over the chat socket. Anything that does not
/// parse into one of these is dropped without closing the connection.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "chat_message")]
    ChatMessage { message: String },
    #[serde(rename = "read_receipt")]
    ReadReceipt,
}

/// Frames the server pushes to joined sessions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    /// One-time replay right after a session joins, oldest first.
    #[serde(rename = "message_history")]
    MessageHistory { messages: Vec<MessageView> },
    #[serde(rename = "chat_message")]
    ChatMessage { message: MessageView },
    #[serde(rename = "read_receipt")]
    ReadReceipt { user_id: Uuid, room_id: Uuid },
}
