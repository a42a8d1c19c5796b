//! Cross-instance fan-out over Redis pub/sub. Every broadcast is published
//! to the room's channel tagged with the origin instance; each instance's
//! listener re-broadcasts foreign events into its local registry and skips
//! its own, so local sessions see every event exactly once.

use futures_util::StreamExt;
use redis::AsyncCommands;
use redis::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ConnectionRegistry;
use axum::extract::ws::Message;

fn channel_for_room(id: Uuid) -> String {
    format!("chat_room:{id}")
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    origin: Uuid,
    payload: String,
}

#[derive(Clone)]
pub struct RoomPublisher {
    client: Client,
    instance_id: Uuid,
}

impl RoomPublisher {
    pub fn new(client: Client, instance_id: Uuid) -> Self {
        Self {
            client,
            instance_id,
        }
    }

    pub async fn publish(&self, room_id: Uuid, payload: &str) -> redis::RedisResult<()> {
        let envelope = serde_json::to_string(&Envelope {
            origin: self.instance_id,
            payload: payload.to_string(),
        })
        .map_err(|e| {
            redis::RedisError::from((
                redis::ErrorKind::TypeError,
                "serialize room envelope",
                e.to_string(),
            ))
        })?;

        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.publish::<_, _, ()>(channel_for_room(room_id), envelope)
            .await
    }
}

pub async fn start_pubsub_listener(
    client: Client,
    instance_id: Uuid,
    registry: ConnectionRegistry,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not multiplexed
    let conn = client.get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("chat_room:*").await?;
    let mut stream = pubsub.on_message();

    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let raw: String = msg.get_payload()?;

        let Some(id_part) = channel.strip_prefix("chat_room:") else {
            continue;
        };
        let Ok(room_id) = Uuid::parse_str(id_part) else {
            continue;
        };
        let Ok(envelope) = serde_json::from_str::<Envelope>(&raw) else {
            continue;
        };
        // Our own publishes were already delivered to local sessions.
        if envelope.origin == instance_id {
            continue;
        }

        registry
            .broadcast(room_id, Message::Text(envelope.payload))
            .await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_round_trip_keeps_origin() {
        let origin = Uuid::new_v4();
        let envelope = Envelope {
            origin,
            payload: r#"{"type":"read_receipt"}"#.into(),
        };
        let raw = serde_json::to_string(&envelope).unwrap();
        let parsed: Envelope = serde_json::from_str(&raw).unwrap();

        assert_eq!(parsed.origin, origin);
        assert_eq!(parsed.payload, envelope.payload);
    }

    #[test]
    fn channel_name_embeds_room_id() {
        let room = Uuid::new_v4();
        let channel = channel_for_room(room);
        assert_eq!(channel.strip_prefix("chat_room:"), Some(room.to_string().as_str()));
    }
}
