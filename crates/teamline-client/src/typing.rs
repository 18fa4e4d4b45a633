use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

use teamline_types::events::ServerEvent;

/// How long a received typing signal stays visible without a refresh.
pub const INDICATOR_TTL: Duration = Duration::from_secs(3);

/// Composer inactivity window after which a trailing stop-typing is due.
pub const COMPOSER_IDLE: Duration = Duration::from_secs(2);

/// Receiver side of the typing indicator: tracks who is typing where,
/// keyed per (channel, user). Indicators expire locally after
/// [`INDICATOR_TTL`] even if the explicit stop signal never arrives, and
/// the viewer's own identity never renders.
#[derive(Debug)]
pub struct TypingTracker {
    own_user: Uuid,
    last_signal: HashMap<(Uuid, Uuid), Typist>,
}

#[derive(Debug, Clone)]
struct Typist {
    username: String,
    seen_at: Instant,
}

impl TypingTracker {
    pub fn new(own_user: Uuid) -> Self {
        Self {
            own_user,
            last_signal: HashMap::new(),
        }
    }

    /// Feed a gateway event through the tracker. Non-typing events are
    /// ignored, as are the viewer's own signals.
    pub fn observe(&mut self, event: &ServerEvent, now: Instant) {
        match event {
            ServerEvent::UserTyping {
                user_id,
                username,
                channel_id,
            } => {
                if *user_id == self.own_user {
                    return;
                }
                self.last_signal.insert(
                    (*channel_id, *user_id),
                    Typist {
                        username: username.clone(),
                        seen_at: now,
                    },
                );
            }
            ServerEvent::UserStopTyping {
                user_id,
                channel_id,
            } => {
                self.last_signal.remove(&(*channel_id, *user_id));
            }
            _ => {}
        }
    }

    /// Who is currently typing in the given channel. Prunes entries older
    /// than [`INDICATOR_TTL`] across all channels as a side effect.
    pub fn typists(&mut self, channel_id: Uuid, now: Instant) -> Vec<(Uuid, String)> {
        self.last_signal
            .retain(|_, typist| now.duration_since(typist.seen_at) < INDICATOR_TTL);

        let mut typists: Vec<(Uuid, String)> = self
            .last_signal
            .iter()
            .filter(|((channel, _), _)| *channel == channel_id)
            .map(|((_, user), typist)| (*user, typist.username.clone()))
            .collect();
        typists.sort_by(|a, b| a.1.cmp(&b.1));
        typists
    }
}

/// What the composer should emit to the gateway, if anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerSignal {
    StartTyping,
    StopTyping,
}

/// Sender side of the typing indicator: collapses a burst of keystrokes into
/// one `typing` emission on the idle-to-typing transition, with a trailing
/// `stop-typing` once the composer has been quiet for [`COMPOSER_IDLE`].
#[derive(Debug, Default)]
pub struct TypingDebouncer {
    typing_since: Option<Instant>,
    last_keystroke: Option<Instant>,
}

impl TypingDebouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Call on every keystroke. Returns `StartTyping` only on the first
    /// keystroke of a burst; repeats within the burst emit nothing.
    pub fn on_keystroke(&mut self, now: Instant) -> Option<ComposerSignal> {
        self.last_keystroke = Some(now);
        if self.typing_since.is_none() {
            self.typing_since = Some(now);
            Some(ComposerSignal::StartTyping)
        } else {
            None
        }
    }

    /// Poll the inactivity window; call periodically (e.g. on a UI tick).
    /// Returns `StopTyping` exactly once when the burst has gone idle.
    pub fn poll(&mut self, now: Instant) -> Option<ComposerSignal> {
        let last = self.last_keystroke?;
        if self.typing_since.is_some() && now.duration_since(last) >= COMPOSER_IDLE {
            self.typing_since = None;
            self.last_keystroke = None;
            Some(ComposerSignal::StopTyping)
        } else {
            None
        }
    }

    /// The message was sent or the composer was cleared: the burst is over
    /// immediately. Returns `StopTyping` if one is owed.
    pub fn reset(&mut self) -> Option<ComposerSignal> {
        self.last_keystroke = None;
        self.typing_since
            .take()
            .map(|_| ComposerSignal::StopTyping)
    }
}
