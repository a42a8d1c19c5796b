use crate::{
    config::Config,
    services::notifier::Notifier,
    websocket::{pubsub::RoomPublisher, ConnectionRegistry},
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub registry: ConnectionRegistry,
    pub publisher: RoomPublisher,
    pub notifier: Notifier,
    pub config: Arc<Config>,
}
