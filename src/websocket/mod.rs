use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::ws::Message;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use tracing::{error, warn};
use uuid::Uuid;

pub mod message_types;
pub mod pubsub;
pub mod session;

use message_types::ServerFrame;
use pubsub::RoomPublisher;

pub type SessionId = u64;

/// Per-room registry of live WebSocket sessions. Injected through
/// `AppState`; one instance per process, no global state.
///
/// Fan-out goes through unbounded channels, so a slow or dead receiver
/// never blocks delivery to the rest of the room. Dead senders are pruned
/// on broadcast and removed deterministically by `leave`.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // room_id -> live session senders
    inner: Arc<RwLock<HashMap<Uuid, Vec<(SessionId, UnboundedSender<Message>)>>>>,
    next_id: Arc<AtomicU64>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session with a room. Events published after this call
    /// are delivered to the returned receiver; earlier events are not
    /// (history replay is the gateway's job).
    pub async fn join(&self, room_id: Uuid) -> (SessionId, UnboundedReceiver<Message>) {
        let (tx, rx) = unbounded_channel();
        let session_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.inner.write().await;
        guard.entry(room_id).or_default().push((session_id, tx));
        (session_id, rx)
    }

    /// Remove a session from a room. Runs on every termination path of a
    /// connection and is a no-op if the session is already gone.
    pub async fn leave(&self, room_id: Uuid, session_id: SessionId) {
        let mut guard = self.inner.write().await;
        if let Some(sessions) = guard.get_mut(&room_id) {
            sessions.retain(|(id, _)| *id != session_id);
            if sessions.is_empty() {
                guard.remove(&room_id);
            }
        }
    }

    /// Deliver a frame to every session currently in the room, pruning
    /// sessions whose receiving side has gone away.
    pub async fn broadcast(&self, room_id: Uuid, msg: Message) {
        let mut guard = self.inner.write().await;
        if let Some(sessions) = guard.get_mut(&room_id) {
            sessions.retain(|(_, tx)| tx.send(msg.clone()).is_ok());
        }
    }

    pub async fn session_count(&self, room_id: Uuid) -> usize {
        self.inner
            .read()
            .await
            .get(&room_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

/// Fan a server frame out to the room: local sessions directly, other
/// instances via Redis pub/sub. Called only after the corresponding store
/// write has committed.
///
/// Commit and fan-out are not one atomic step: two senders committing
/// concurrently may fan out in the opposite order. The store's seq column
/// remains the authoritative per-room order; history replay follows it.
pub async fn broadcast_frame(
    registry: &ConnectionRegistry,
    publisher: &RoomPublisher,
    room_id: Uuid,
    frame: &ServerFrame,
) {
    let payload = match serde_json::to_string(frame) {
        Ok(p) => p,
        Err(e) => {
            error!(error = %e, %room_id, "failed to serialize room event");
            return;
        }
    };

    registry
        .broadcast(room_id, Message::Text(payload.clone()))
        .await;

    if let Err(e) = publisher.publish(room_id, &payload).await {
        warn!(error = %e, %room_id, "failed to publish room event to redis");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Message {
        Message::Text(s.to_string())
    }

    #[tokio::test]
    async fn broadcast_reaches_all_room_sessions() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();

        let (_s1, mut rx1) = registry.join(room).await;
        let (_s2, mut rx2) = registry.join(room).await;

        registry.broadcast(room, text("hello")).await;

        assert_eq!(rx1.recv().await.unwrap(), text("hello"));
        assert_eq!(rx2.recv().await.unwrap(), text("hello"));
    }

    #[tokio::test]
    async fn fan_out_is_isolated_per_room() {
        let registry = ConnectionRegistry::new();
        let room_a = Uuid::new_v4();
        let room_b = Uuid::new_v4();

        let (_s1, mut rx_a) = registry.join(room_a).await;
        let (_s3, mut rx_b) = registry.join(room_b).await;

        registry.broadcast(room_a, text("for A")).await;

        assert_eq!(rx_a.recv().await.unwrap(), text("for A"));
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn sessions_joining_after_publish_miss_the_event() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();

        registry.broadcast(room, text("early")).await;

        let (_s1, mut rx) = registry.join(room).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_stops_delivery_and_empties_room() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();

        let (s1, mut rx) = registry.join(room).await;
        assert_eq!(registry.session_count(room).await, 1);

        registry.leave(room, s1).await;
        assert_eq!(registry.session_count(room).await, 0);

        registry.broadcast(room, text("late")).await;
        assert!(rx.try_recv().is_err());

        // leaving twice is a no-op
        registry.leave(room, s1).await;
    }

    #[tokio::test]
    async fn dead_receivers_are_pruned_without_stalling_others() {
        let registry = ConnectionRegistry::new();
        let room = Uuid::new_v4();

        let (_dead, rx_dead) = registry.join(room).await;
        let (_live, mut rx_live) = registry.join(room).await;
        drop(rx_dead);

        registry.broadcast(room, text("still flowing")).await;

        assert_eq!(rx_live.recv().await.unwrap(), text("still flowing"));
        assert_eq!(registry.session_count(room).await, 1);
    }
}
