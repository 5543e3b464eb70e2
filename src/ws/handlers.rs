//! Client message dispatch
//!
//! Each inbound event maps to one state operation; broadcasts to the room
//! happen inside the state layer, while direct replies and room-membership
//! changes are returned to the socket loop as a `Dispatch`.

use crate::error::SessionError;
use crate::protocol::{ClientMessage, ServerMessage, UserInfo};
use crate::state::{AppState, LeaveOutcome};
use crate::types::{GameKind, SessionStatus};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Room-membership change requested by a handler, applied by the socket loop.
#[derive(Debug)]
pub enum Subscription {
    Unchanged,
    Enter {
        session_id: String,
        receiver: broadcast::Receiver<ServerMessage>,
    },
    Exit,
}

/// The outcome of handling one client message.
#[derive(Debug)]
pub struct Dispatch {
    /// Messages for the originating connection only
    pub replies: Vec<ServerMessage>,
    pub subscription: Subscription,
}

impl Dispatch {
    fn none() -> Self {
        Self {
            replies: Vec::new(),
            subscription: Subscription::Unchanged,
        }
    }

    fn reply(msg: ServerMessage) -> Self {
        Self {
            replies: vec![msg],
            subscription: Subscription::Unchanged,
        }
    }
}

fn error_reply(err: SessionError) -> ServerMessage {
    ServerMessage::Error {
        code: err.code().to_string(),
        msg: err.to_string(),
    }
}

pub async fn handle_message(
    msg: ClientMessage,
    connection_id: &str,
    current_session: Option<&str>,
    state: &Arc<AppState>,
) -> Dispatch {
    match msg {
        ClientMessage::CreateSession { session_id } => {
            // A connection is in at most one room; switching rooms leaves the
            // previous one first
            if let Some(previous) = current_session {
                if previous != session_id {
                    state.leave_session(previous, connection_id).await;
                }
            }
            let (host, receiver) = state.create_session(&session_id, connection_id).await;
            let restaurants = state.current_restaurants(&session_id).await;
            Dispatch {
                replies: vec![
                    ServerMessage::RoleAssigned { role: host.role },
                    ServerMessage::UserDetails {
                        user: UserInfo::from(&host),
                    },
                    ServerMessage::CurrentRestaurants { restaurants },
                ],
                subscription: Subscription::Enter {
                    session_id,
                    receiver,
                },
            }
        }

        ClientMessage::CheckSession { session_id } => {
            match state.check_session(&session_id).await {
                SessionStatus::Exists => Dispatch::reply(ServerMessage::SessionExists),
                SessionStatus::Full => Dispatch::reply(ServerMessage::RoomFull),
                SessionStatus::NotFound => Dispatch::reply(ServerMessage::SessionNotFound),
            }
        }

        ClientMessage::JoinSession { session_id } => {
            if let Some(previous) = current_session {
                if previous != session_id {
                    state.leave_session(previous, connection_id).await;
                }
            }
            match state.join_session(&session_id, connection_id).await {
                Ok((guest, receiver)) => {
                    let restaurants = state.current_restaurants(&session_id).await;
                    Dispatch {
                        replies: vec![
                            ServerMessage::RoleAssigned { role: guest.role },
                            ServerMessage::UserDetails {
                                user: UserInfo::from(&guest),
                            },
                            ServerMessage::CurrentRestaurants { restaurants },
                            ServerMessage::JoinSuccess {
                                session_id: session_id.clone(),
                            },
                        ],
                        subscription: Subscription::Enter {
                            session_id,
                            receiver,
                        },
                    }
                }
                Err(SessionError::NotFound) => Dispatch::reply(ServerMessage::SessionNotFound),
                Err(SessionError::RoomFull) => Dispatch::reply(ServerMessage::RoomFull),
                Err(e) => Dispatch::reply(error_reply(e)),
            }
        }

        ClientMessage::LeaveSession { session_id } => {
            match state.leave_session(&session_id, connection_id).await {
                LeaveOutcome::SessionClosed => Dispatch {
                    replies: vec![ServerMessage::SessionDeleted],
                    subscription: Subscription::Exit,
                },
                LeaveOutcome::GuestLeft => Dispatch {
                    replies: Vec::new(),
                    subscription: Subscription::Exit,
                },
                LeaveOutcome::NotMember => Dispatch::none(),
            }
        }

        ClientMessage::SuggestRestaurant {
            session_id,
            restaurant,
        } => match state.suggest(&session_id, connection_id, restaurant).await {
            // The pool broadcast reaches the suggester too; no direct reply
            Ok(_) => Dispatch::none(),
            Err(err @ SessionError::AlreadySuggested) => Dispatch::reply(error_reply(err)),
            // Out-of-session suggestions are silently ignored
            Err(_) => Dispatch::none(),
        },

        ClientMessage::SpinWheel => {
            let Some(session_id) = current_session else {
                return Dispatch::none();
            };
            match state.spin_wheel(session_id, connection_id).await {
                Ok(()) => Dispatch::none(),
                Err(err @ SessionError::NotAuthorized(_)) => Dispatch::reply(error_reply(err)),
                // An empty pool is ignored rather than an error
                Err(_) => Dispatch::none(),
            }
        }

        ClientMessage::StartPlateBalance => {
            handle_start_game(state, connection_id, current_session, GameKind::PlateBalance).await
        }
        ClientMessage::StartQuickDraw => {
            handle_start_game(state, connection_id, current_session, GameKind::QuickDraw).await
        }

        ClientMessage::PlateBalanceFinished { time_balanced } => {
            handle_game_finished(
                state,
                connection_id,
                current_session,
                GameKind::PlateBalance,
                time_balanced,
            )
            .await
        }
        ClientMessage::QuickDrawFinished { reaction_time } => {
            handle_game_finished(
                state,
                connection_id,
                current_session,
                GameKind::QuickDraw,
                reaction_time,
            )
            .await
        }

        ClientMessage::GameOptionChanged {
            session_id,
            game_option,
        } => {
            state
                .game_option_changed(&session_id, connection_id, game_option)
                .await;
            Dispatch::none()
        }

        ClientMessage::DeleteSession => {
            let Some(session_id) = current_session else {
                return Dispatch::none();
            };
            state.delete_session(session_id).await;
            Dispatch {
                replies: vec![ServerMessage::SessionDeleted],
                subscription: Subscription::Exit,
            }
        }
    }
}

async fn handle_start_game(
    state: &Arc<AppState>,
    connection_id: &str,
    current_session: Option<&str>,
    kind: GameKind,
) -> Dispatch {
    let Some(session_id) = current_session else {
        return Dispatch::none();
    };
    match state.start_game(session_id, connection_id, kind).await {
        Ok(()) => Dispatch::none(),
        Err(err @ SessionError::NotAuthorized(_)) => Dispatch::reply(error_reply(err)),
        Err(_) => Dispatch::none(),
    }
}

async fn handle_game_finished(
    state: &Arc<AppState>,
    connection_id: &str,
    current_session: Option<&str>,
    kind: GameKind,
    score: f64,
) -> Dispatch {
    let Some(session_id) = current_session else {
        return Dispatch::none();
    };
    // Resolution broadcasts go through the room channel; submissions never
    // get a direct reply
    let _ = state
        .submit_score(session_id, connection_id, kind, score)
        .await;
    Dispatch::none()
}
