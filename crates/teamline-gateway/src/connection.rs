use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use teamline_types::events::{ClientCommand, ServerEvent};

use crate::rooms::RoomRegistry;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Handle a single WebSocket connection for its whole lifetime.
///
/// No authentication happens here: any connection may join any channel room.
/// That is a documented limitation of the protocol, not an oversight.
pub async fn handle_connection(socket: WebSocket, rooms: RoomRegistry) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut event_rx) = rooms.register().await;
    info!("connection {} joined the gateway", conn_id);

    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward room events to the client, interleaved with heartbeats.
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                event = event_rx.recv() => {
                    let Some(event) = event else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!("dropping unserializable event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read control commands from the client. A malformed frame is logged and
    // skipped; it must never take the gateway down.
    let rooms_recv = rooms.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<ClientCommand>(&text) {
                    Ok(cmd) => handle_command(&rooms_recv, conn_id, cmd).await,
                    Err(e) => {
                        let raw: String = text.chars().take(200).collect();
                        warn!(
                            "connection {} sent a bad command: {} -- raw: {}",
                            conn_id, e, raw
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Whichever task finishes first tears the connection down.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    rooms.unregister(conn_id).await;
    info!("connection {} left the gateway", conn_id);
}

async fn handle_command(rooms: &RoomRegistry, conn_id: Uuid, cmd: ClientCommand) {
    match cmd {
        ClientCommand::JoinChannel { channel_id } => {
            rooms.join(conn_id, channel_id).await;
        }

        ClientCommand::LeaveChannel { channel_id } => {
            rooms.leave(conn_id, channel_id).await;
        }

        // Typing signals are relayed to the rest of the room only; the
        // originating connection already knows it is typing.
        ClientCommand::Typing {
            channel_id,
            user_id,
            username,
        } => {
            rooms
                .broadcast(
                    channel_id,
                    ServerEvent::UserTyping {
                        user_id,
                        username,
                        channel_id,
                    },
                    Some(conn_id),
                )
                .await;
        }

        ClientCommand::StopTyping {
            channel_id,
            user_id,
        } => {
            rooms
                .broadcast(
                    channel_id,
                    ServerEvent::UserStopTyping {
                        user_id,
                        channel_id,
                    },
                    Some(conn_id),
                )
                .await;
        }
    }
}
