use std::sync::Arc;

use teamline_bridge::SlackBridge;
use teamline_db::Database;
use teamline_gateway::rooms::RoomRegistry;

/// Shared application state: the store, the room registry the gateway owns,
/// and the optional external mirror.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub rooms: RoomRegistry,
    pub bridge: Option<Arc<SlackBridge>>,
}

impl AppState {
    pub fn new(db: Arc<Database>, rooms: RoomRegistry, bridge: Option<SlackBridge>) -> Self {
        Self {
            db,
            rooms,
            bridge: bridge.map(Arc::new),
        }
    }
}
