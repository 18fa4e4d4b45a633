use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tracing::debug;
use uuid::Uuid;

use teamline_types::events::ServerEvent;

/// Maps channel ids to the set of connections subscribed to them, with a
/// reverse index from connection id to joined channels so disconnect cleanup
/// is O(rooms joined) rather than a scan over every room.
///
/// State is process-local: nothing here survives a restart, and broadcasts
/// never cross process boundaries. Clients rejoin their rooms on reconnect.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RwLock<Rooms>>,
}

#[derive(Default)]
struct Rooms {
    /// channel_id -> subscribed connection ids
    members: HashMap<Uuid, HashSet<Uuid>>,
    /// connection_id -> joined channel ids
    joined: HashMap<Uuid, HashSet<Uuid>>,
    /// connection_id -> outbound event queue
    senders: HashMap<Uuid, mpsc::UnboundedSender<ServerEvent>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Rooms::default())),
        }
    }

    /// Register a new connection. Returns its id and the receiving half of
    /// its event queue; the connection task drains it into the socket.
    pub async fn register(&self) -> (Uuid, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let mut rooms = self.inner.write().await;
        rooms.senders.insert(conn_id, tx);
        rooms.joined.insert(conn_id, HashSet::new());

        (conn_id, rx)
    }

    /// Remove a connection from every room it joined and drop its sender.
    /// Idempotent; called once on disconnect.
    pub async fn unregister(&self, conn_id: Uuid) {
        let mut rooms = self.inner.write().await;

        if let Some(joined) = rooms.joined.remove(&conn_id) {
            for channel_id in joined {
                if let Some(members) = rooms.members.get_mut(&channel_id) {
                    members.remove(&conn_id);
                    if members.is_empty() {
                        rooms.members.remove(&channel_id);
                    }
                }
            }
        }
        rooms.senders.remove(&conn_id);
    }

    /// Add the connection to a room. Joining twice has no additional effect.
    pub async fn join(&self, conn_id: Uuid, channel_id: Uuid) {
        let mut rooms = self.inner.write().await;

        if !rooms.senders.contains_key(&conn_id) {
            return;
        }
        rooms.members.entry(channel_id).or_default().insert(conn_id);
        rooms.joined.entry(conn_id).or_default().insert(channel_id);

        debug!("connection {} joined room {}", conn_id, channel_id);
    }

    /// Remove the connection from a room. Leaving a room it never joined is
    /// a no-op.
    pub async fn leave(&self, conn_id: Uuid, channel_id: Uuid) {
        let mut rooms = self.inner.write().await;

        if let Some(members) = rooms.members.get_mut(&channel_id) {
            members.remove(&conn_id);
            if members.is_empty() {
                rooms.members.remove(&channel_id);
            }
        }
        if let Some(joined) = rooms.joined.get_mut(&conn_id) {
            joined.remove(&channel_id);
        }
    }

    /// Deliver an event to every member of the room, except `exclude`
    /// (used for sender exclusion on typing relays). Send failures mean the
    /// receiving task already went away; disconnect cleanup handles the rest.
    pub async fn broadcast(&self, channel_id: Uuid, event: ServerEvent, exclude: Option<Uuid>) {
        let rooms = self.inner.read().await;

        let Some(members) = rooms.members.get(&channel_id) else {
            return;
        };
        for conn_id in members {
            if Some(*conn_id) == exclude {
                continue;
            }
            if let Some(tx) = rooms.senders.get(conn_id) {
                let _ = tx.send(event.clone());
            }
        }
    }

    /// Channels this connection is currently subscribed to.
    pub async fn joined_channels(&self, conn_id: Uuid) -> HashSet<Uuid> {
        let rooms = self.inner.read().await;
        rooms.joined.get(&conn_id).cloned().unwrap_or_default()
    }

    /// Number of connections currently in the room.
    pub async fn room_size(&self, channel_id: Uuid) -> usize {
        let rooms = self.inner.read().await;
        rooms.members.get(&channel_id).map_or(0, |m| m.len())
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
