use crate::types::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateSession {
        session_id: SessionId,
    },
    CheckSession {
        session_id: SessionId,
    },
    JoinSession {
        session_id: SessionId,
    },
    LeaveSession {
        session_id: SessionId,
    },
    SuggestRestaurant {
        session_id: SessionId,
        restaurant: String,
    },
    /// Host-only random draw over the suggestion pool. The session is implied
    /// by the caller's room membership.
    SpinWheel,
    StartPlateBalance,
    PlateBalanceFinished {
        /// How long the player kept the plate up, in milliseconds
        time_balanced: f64,
    },
    StartQuickDraw,
    QuickDrawFinished {
        /// Reaction time in milliseconds
        reaction_time: f64,
    },
    /// Re-broadcast the host's currently highlighted game option; no state
    /// change on the server.
    GameOptionChanged {
        session_id: SessionId,
        game_option: String,
    },
    DeleteSession,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    RoleAssigned {
        role: Role,
    },
    UserDetails {
        user: UserInfo,
    },
    JoinSuccess {
        session_id: SessionId,
    },
    /// Replies to `check_session`
    SessionExists,
    RoomFull,
    SessionNotFound,
    /// Broadcast after every membership change; `count` always equals
    /// `users.len()`.
    CurrentUsers {
        users: Vec<UserInfo>,
        count: usize,
    },
    CurrentRestaurants {
        restaurants: Vec<SuggestionInfo>,
    },
    RestaurantSuggested {
        restaurant: SuggestionInfo,
    },
    SpinWheel {
        restaurant: SuggestionInfo,
        index: usize,
    },
    PlateBalanceStarted,
    QuickDrawStarted,
    PlateBalanceWinner {
        restaurant: String,
        username: String,
        score: String,
        ranking: Vec<RankedScore>,
    },
    QuickDrawWinner {
        restaurant: String,
        username: String,
        score: String,
        ranking: Vec<RankedScore>,
    },
    GameOptionChanged {
        game_option: String,
    },
    SessionDeleted,
    Error {
        code: String,
        msg: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserInfo {
    pub id: ConnectionId,
    pub username: String,
    pub role: Role,
}

impl From<&Participant> for UserInfo {
    fn from(p: &Participant) -> Self {
        Self {
            id: p.id.clone(),
            username: p.username.clone(),
            role: p.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuggestionInfo {
    pub restaurant: String,
    pub suggested_by: String,
    pub suggested_by_id: ConnectionId,
}

impl From<&Suggestion> for SuggestionInfo {
    fn from(s: &Suggestion) -> Self {
        Self {
            restaurant: s.restaurant.clone(),
            suggested_by: s.suggested_by.clone(),
            suggested_by_id: s.suggested_by_id.clone(),
        }
    }
}

/// One row of the full ranked score list sent with a winner broadcast.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedScore {
    pub id: ConnectionId,
    pub username: String,
    pub score: f64,
}

impl From<&ScoreEntry> for RankedScore {
    fn from(e: &ScoreEntry) -> Self {
        Self {
            id: e.participant_id.clone(),
            username: e.username.clone(),
            score: e.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"join_session","session_id":"ABC"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::JoinSession {
                session_id: "ABC".to_string()
            }
        );

        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"quick_draw_finished","reaction_time":250}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::QuickDrawFinished {
                reaction_time: 250.0
            }
        );
    }

    #[test]
    fn test_server_message_wire_format() {
        let json = serde_json::to_string(&ServerMessage::CurrentUsers {
            users: vec![],
            count: 0,
        })
        .unwrap();
        assert!(json.contains(r#""t":"current_users""#));

        let json =
            serde_json::to_string(&ServerMessage::RoleAssigned { role: Role::Host }).unwrap();
        assert!(json.contains(r#""role":"host""#));
    }
}
