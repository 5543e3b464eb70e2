mod game;
mod session;
mod suggestion;

pub use game::GameMatch;
pub use session::LeaveOutcome;

use crate::protocol::{ServerMessage, UserInfo};
use crate::types::*;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

/// One live room: host, guests, the suggestion pool, any in-flight mini-game
/// matches, and the broadcast channel every member's connection listens on.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub host: Participant,
    pub guests: Vec<Participant>,
    pub suggestions: Vec<Suggestion>,
    pub matches: HashMap<GameKind, GameMatch>,
    pub channel: broadcast::Sender<ServerMessage>,
}

impl Session {
    /// Total participant count, host included.
    pub fn participant_count(&self) -> usize {
        self.guests.len() + 1
    }

    pub fn participant(&self, connection_id: &str) -> Option<&Participant> {
        if self.host.id == connection_id {
            Some(&self.host)
        } else {
            self.guests.iter().find(|g| g.id == connection_id)
        }
    }

    pub fn contains(&self, connection_id: &str) -> bool {
        self.participant(connection_id).is_some()
    }

    pub fn is_host(&self, connection_id: &str) -> bool {
        self.host.id == connection_id
    }

    /// Emit to every member of the room. Send errors mean no receivers are
    /// connected, which is fine.
    pub fn emit(&self, msg: ServerMessage) {
        let _ = self.channel.send(msg);
    }

    pub fn current_users_message(&self) -> ServerMessage {
        let mut users: Vec<UserInfo> = Vec::with_capacity(self.participant_count());
        users.push(UserInfo::from(&self.host));
        users.extend(self.guests.iter().map(UserInfo::from));
        ServerMessage::CurrentUsers {
            count: users.len(),
            users,
        }
    }

    pub fn current_restaurants_message(&self) -> ServerMessage {
        ServerMessage::CurrentRestaurants {
            restaurants: self.suggestions.iter().map(Into::into).collect(),
        }
    }
}

/// Shared application state: the session directory. Constructed once in
/// `main` and injected as `Arc<AppState>`; all mutation happens under the
/// single write lock, so every inbound event is applied atomically.
pub struct AppState {
    pub sessions: RwLock<HashMap<SessionId, Session>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
