use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Message;

/// Commands sent FROM client TO server over the WebSocket gateway.
///
/// Wire format: `{"type": "<name>", "data": {...}}` with camelCase fields,
/// so the server and every client share one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientCommand {
    /// Subscribe this connection to a channel's room.
    #[serde(rename = "join-channel", rename_all = "camelCase")]
    JoinChannel { channel_id: Uuid },

    /// Unsubscribe this connection from a channel's room.
    #[serde(rename = "leave-channel", rename_all = "camelCase")]
    LeaveChannel { channel_id: Uuid },

    /// The user has uncommitted text in the composer. Relayed to the rest
    /// of the room, never echoed back to the sender.
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing {
        channel_id: Uuid,
        user_id: Uuid,
        username: String,
    },

    /// The user stopped typing (composer cleared or went idle).
    #[serde(rename = "stop-typing", rename_all = "camelCase")]
    StopTyping { channel_id: Uuid, user_id: Uuid },
}

/// Room-scoped events pushed from server to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    /// A message was persisted via the REST write path.
    #[serde(rename = "newMessage")]
    NewMessage(Message),

    /// A user in the room is typing. Ephemeral: receivers expire it locally.
    #[serde(rename = "user-typing", rename_all = "camelCase")]
    UserTyping {
        user_id: Uuid,
        username: String,
        channel_id: Uuid,
    },

    #[serde(rename = "user-stop-typing", rename_all = "camelCase")]
    UserStopTyping { user_id: Uuid, channel_id: Uuid },

    /// A message's content was edited in place.
    #[serde(rename = "message-updated")]
    MessageUpdated(Message),

    #[serde(rename = "message-deleted", rename_all = "camelCase")]
    MessageDeleted { message_id: Uuid },

    /// A reaction toggle went through; carries the refreshed message.
    #[serde(rename = "reaction-added", rename_all = "camelCase")]
    ReactionAdded { message_id: Uuid, message: Message },
}

impl ServerEvent {
    /// Returns the channel this event is scoped to, when it carries one.
    /// `MessageDeleted` identifies its target by message id alone.
    pub fn channel_id(&self) -> Option<Uuid> {
        match self {
            Self::NewMessage(m) => Some(m.channel_id),
            Self::UserTyping { channel_id, .. } => Some(*channel_id),
            Self::UserStopTyping { channel_id, .. } => Some(*channel_id),
            Self::MessageUpdated(m) => Some(m.channel_id),
            Self::ReactionAdded { message, .. } => Some(message.channel_id),
            Self::MessageDeleted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_names_match_protocol() {
        let cmd = ClientCommand::JoinChannel {
            channel_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "join-channel");
        assert!(json["data"]["channelId"].is_string());

        let cmd = ClientCommand::StopTyping {
            channel_id: Uuid::nil(),
            user_id: Uuid::nil(),
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "stop-typing");
    }

    #[test]
    fn typing_event_round_trips() {
        let raw = r#"{"type":"user-typing","data":{"userId":"00000000-0000-0000-0000-000000000001","username":"Admin","channelId":"00000000-0000-0000-0000-000000000002"}}"#;
        let event: ServerEvent = serde_json::from_str(raw).unwrap();
        match &event {
            ServerEvent::UserTyping { username, .. } => assert_eq!(username, "Admin"),
            other => panic!("unexpected event: {other:?}"),
        }
        let back = serde_json::to_string(&event).unwrap();
        assert_eq!(serde_json::from_str::<ServerEvent>(&back).unwrap(), event);
    }
}
