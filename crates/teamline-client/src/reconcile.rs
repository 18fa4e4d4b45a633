use tracing::debug;
use uuid::Uuid;

use teamline_types::events::{ClientCommand, ServerEvent};
use teamline_types::models::Message;

/// The local message list for the active channel, merged from the REST
/// fetch-on-load and the realtime stream.
///
/// Invariant: a message id appears at most once, no matter in which order
/// the REST echo and the `newMessage` broadcast of the same write arrive.
#[derive(Debug, Default)]
pub struct MessageLog {
    active_channel: Option<Uuid>,
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_channel(&self) -> Option<Uuid> {
        self.active_channel
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Switch the view to another channel. The previous channel's list is
    /// discarded (no merge across channels), and the returned commands tell
    /// the gateway to leave the old room and join the new one. Callers emit
    /// them in order, then load the REST page via [`MessageLog::load`].
    pub fn switch_channel(&mut self, channel_id: Uuid) -> Vec<ClientCommand> {
        if self.active_channel == Some(channel_id) {
            return Vec::new();
        }

        let mut commands = Vec::with_capacity(2);
        if let Some(previous) = self.active_channel {
            commands.push(ClientCommand::LeaveChannel {
                channel_id: previous,
            });
        }
        commands.push(ClientCommand::JoinChannel { channel_id });

        self.active_channel = Some(channel_id);
        self.messages.clear();
        commands
    }

    /// Replace the local list with a freshly fetched page (chronological
    /// order). Stale responses for a channel that is no longer active are
    /// dropped.
    pub fn load(&mut self, channel_id: Uuid, page: Vec<Message>) {
        if self.active_channel != Some(channel_id) {
            debug!("dropping stale page for channel {}", channel_id);
            return;
        }
        self.messages = page;
    }

    /// Record the REST echo of a message this client just sent. The same
    /// message may already have arrived over the gateway.
    pub fn record_sent(&mut self, message: Message) {
        if self.active_channel != Some(message.channel_id) {
            return;
        }
        self.push_deduped(message);
    }

    /// Apply a realtime event to the local list. Returns true if the list
    /// changed. Events for channels other than the active one are ignored;
    /// typing signals are not this type's concern.
    pub fn apply(&mut self, event: &ServerEvent) -> bool {
        match event {
            ServerEvent::NewMessage(message) => {
                if self.active_channel != Some(message.channel_id) {
                    return false;
                }
                self.push_deduped(message.clone())
            }

            ServerEvent::MessageUpdated(message)
            | ServerEvent::ReactionAdded { message, .. } => {
                if self.active_channel != Some(message.channel_id) {
                    return false;
                }
                self.replace(message)
            }

            ServerEvent::MessageDeleted { message_id } => {
                let before = self.messages.len();
                self.messages.retain(|m| m.id != *message_id);
                self.messages.len() != before
            }

            ServerEvent::UserTyping { .. } | ServerEvent::UserStopTyping { .. } => false,
        }
    }

    /// Append in receipt order unless the id is already present.
    fn push_deduped(&mut self, message: Message) -> bool {
        if self.messages.iter().any(|m| m.id == message.id) {
            return false;
        }
        self.messages.push(message);
        true
    }

    fn replace(&mut self, message: &Message) -> bool {
        match self.messages.iter_mut().find(|m| m.id == message.id) {
            Some(slot) => {
                *slot = message.clone();
                true
            }
            None => false,
        }
    }
}
