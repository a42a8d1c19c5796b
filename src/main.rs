use order_chat_service::{
    config::Config,
    db, error, logging, routes,
    services::notifier::{FcmPush, Notifier, PushProvider},
    state::AppState,
    websocket::{pubsub, pubsub::RoomPublisher, ConnectionRegistry},
};
use std::sync::Arc;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(Config::from_env()?);

    let db = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Run embedded migrations (idempotent); the schema must be in sync.
    db::MIGRATOR
        .run(&db)
        .await
        .map_err(|e| error::AppError::StartServer(format!("database migrations failed: {e}")))?;

    let redis = redis::Client::open(cfg.redis_url.as_str())
        .map_err(|e| error::AppError::StartServer(format!("redis: {e}")))?;

    let instance_id = Uuid::new_v4();
    let registry = ConnectionRegistry::new();
    let publisher = RoomPublisher::new(redis.clone(), instance_id);

    let push: Option<Arc<dyn PushProvider>> = cfg
        .fcm_api_key
        .clone()
        .map(|key| Arc::new(FcmPush::new(key)) as Arc<dyn PushProvider>);
    if push.is_none() {
        tracing::info!("FCM_API_KEY not set; chat push notifications disabled");
    }
    let notifier = Notifier::new(push);

    let state = AppState {
        db,
        registry: registry.clone(),
        publisher,
        notifier,
        config: cfg.clone(),
    };

    // Cross-instance fan-out listener
    tokio::spawn(async move {
        if let Err(e) = pubsub::start_pubsub_listener(redis, instance_id, registry).await {
            tracing::error!(error = %e, "redis pubsub listener failed");
        }
    });

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting order-chat-service");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    axum::serve(listener, routes::build_router(state))
        .await
        .map_err(|e| error::AppError::StartServer(e.to_string()))?;

    Ok(())
}
