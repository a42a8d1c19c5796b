use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

pub mod messages;
pub mod rooms;

use messages::{list_messages, send_message};
use rooms::{get_or_create_room, get_room, list_rooms, mark_read};

pub fn build_router(state: AppState) -> Router {
    // Service introspection (no auth, used by healthchecks)
    let introspection = Router::new().route("/health", get(|| async { "OK" }));

    // The socket authenticates inside its own handshake (token comes from
    // the query string), so it stays outside the bearer middleware.
    let ws = Router::new().route(
        "/ws/chat/:room_id",
        get(crate::websocket::session::ws_handler),
    );

    let api_v1 = Router::new()
        .route("/chat/rooms", get(list_rooms))
        .route("/chat/rooms/:id", get(get_room))
        .route(
            "/chat/rooms/:id/messages",
            get(list_messages).post(send_message),
        )
        .route("/chat/rooms/:id/read", post(mark_read))
        .route("/chat/orders/:order_id/room", get(get_or_create_room))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::middleware::auth::auth_middleware,
        ));

    introspection
        .merge(ws)
        .nest("/api/v1", api_v1)
        .with_state(state)
}
