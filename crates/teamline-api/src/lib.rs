pub mod channels;
pub mod error;
pub mod messages;
pub mod populate;
pub mod reactions;
pub mod state;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post, put},
};
use chrono::Utc;

use crate::state::AppState;
use teamline_gateway::connection;

/// Assemble the full application router: REST surface under /api plus the
/// WebSocket gateway upgrade.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(service_banner))
        .route("/health", get(health))
        .route(
            "/api/channels",
            get(channels::list_channels).post(channels::create_channel),
        )
        .route("/api/channels/add-member", post(channels::add_member))
        .route(
            "/api/channels/{id}",
            get(channels::get_channel).delete(channels::delete_channel),
        )
        .route(
            "/api/messages/channel/{channel_id}",
            get(messages::get_messages_by_channel),
        )
        .route("/api/messages", post(messages::create_message))
        .route(
            "/api/messages/{id}",
            put(messages::update_message).delete(messages::delete_message),
        )
        .route(
            "/api/messages/{message_id}/reaction",
            post(reactions::toggle_reaction),
        )
        .route("/gateway", get(ws_upgrade))
        .with_state(state)
}

async fn service_banner() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Teamline API is running",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health",
            "channels": "/api/channels",
            "messages": "/api/messages",
            "gateway": "/gateway",
        }
    }))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = if state.db.ping() {
        "Connected"
    } else {
        "Disconnected"
    };
    Json(serde_json::json!({
        "status": "OK",
        "timestamp": Utc::now().to_rfc3339(),
        "database": database,
    }))
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, state.rooms.clone()))
}
