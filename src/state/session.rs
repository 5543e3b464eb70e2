use super::{game, AppState, Session};
use crate::error::SessionError;
use crate::protocol::ServerMessage;
use crate::types::*;
use crate::username::generate_username;
use std::collections::HashMap;
use tokio::sync::broadcast;

/// Capacity of a room's broadcast channel. A slow client that lags behind
/// this many messages drops the oldest rather than stalling the room.
const CHANNEL_CAPACITY: usize = 100;

/// What `leave_session` / `disconnect` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The host left; the whole session was torn down.
    SessionClosed,
    /// A guest left; the session continues without them.
    GuestLeft,
    /// The connection was not a member of the session.
    NotMember,
}

impl AppState {
    /// Create a session with the caller as host. Re-creating a live id is
    /// idempotent: the caller is re-admitted as host, replacing whoever held
    /// the role before.
    pub async fn create_session(
        &self,
        session_id: &str,
        connection_id: &str,
    ) -> (Participant, broadcast::Receiver<ServerMessage>) {
        let mut sessions = self.sessions.write().await;

        let host = Participant {
            id: connection_id.to_string(),
            username: generate_username(connection_id),
            role: Role::Host,
        };

        if let Some(session) = sessions.get_mut(session_id) {
            let previous_host_id = session.host.id.clone();
            session.guests.retain(|g| g.id != connection_id);
            session.host = host.clone();

            // The replaced host is gone as far as the room is concerned:
            // withdraw their suggestions and re-check any in-flight matches.
            if previous_host_id != connection_id {
                session.withdraw_suggestions_for(&previous_host_id);
                let resolutions = game::handle_departure(session, &previous_host_id);
                let msg = session.current_restaurants_message();
                session.emit(msg);
                for msg in resolutions {
                    session.emit(msg);
                }
            }

            let receiver = session.channel.subscribe();
            let msg = session.current_users_message();
            session.emit(msg);
            tracing::info!(session_id, connection_id, "re-admitted caller as host");
            return (host, receiver);
        }

        let (channel, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let session = Session {
            id: session_id.to_string(),
            host: host.clone(),
            guests: Vec::new(),
            suggestions: Vec::new(),
            matches: HashMap::new(),
            channel,
        };
        let msg = session.current_users_message();
        session.emit(msg);
        sessions.insert(session_id.to_string(), session);
        tracing::info!(session_id, connection_id, "session created");
        (host, receiver)
    }

    /// Read-only lookup; no side effects.
    pub async fn check_session(&self, session_id: &str) -> SessionStatus {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(s) if s.participant_count() >= SESSION_CAPACITY => SessionStatus::Full,
            Some(_) => SessionStatus::Exists,
            None => SessionStatus::NotFound,
        }
    }

    pub async fn join_session(
        &self,
        session_id: &str,
        connection_id: &str,
    ) -> Result<(Participant, broadcast::Receiver<ServerMessage>), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;

        // Rejoining is idempotent; participant ids stay unique per session
        if let Some(existing) = session.participant(connection_id) {
            let participant = existing.clone();
            let receiver = session.channel.subscribe();
            return Ok((participant, receiver));
        }

        if session.participant_count() >= SESSION_CAPACITY {
            return Err(SessionError::RoomFull);
        }

        let guest = Participant {
            id: connection_id.to_string(),
            username: generate_username(connection_id),
            role: Role::Guest,
        };
        session.guests.push(guest.clone());

        // Subscribe before announcing so the joiner sees the updated list too
        let receiver = session.channel.subscribe();
        let msg = session.current_users_message();
        session.emit(msg);
        tracing::info!(session_id, connection_id, "guest joined");
        Ok((guest, receiver))
    }

    /// Remove a participant. A departing host tears the whole session down;
    /// a departing guest takes their suggestions with them, and any in-flight
    /// match re-checks its quorum against the reduced participant count.
    pub async fn leave_session(&self, session_id: &str, connection_id: &str) -> LeaveOutcome {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(session_id) else {
            return LeaveOutcome::NotMember;
        };

        if session.is_host(connection_id) {
            session.emit(ServerMessage::SessionDeleted);
            sessions.remove(session_id);
            tracing::info!(session_id, connection_id, "host left, session closed");
            return LeaveOutcome::SessionClosed;
        }

        let Some(position) = session.guests.iter().position(|g| g.id == connection_id) else {
            return LeaveOutcome::NotMember;
        };
        let guest = session.guests.remove(position);
        session.withdraw_suggestions_for(&guest.id);
        let resolutions = game::handle_departure(session, &guest.id);

        let msg = session.current_users_message();
        session.emit(msg);
        let msg = session.current_restaurants_message();
        session.emit(msg);
        for msg in resolutions {
            session.emit(msg);
        }
        tracing::info!(session_id, connection_id, "guest left");
        LeaveOutcome::GuestLeft
    }

    /// Force teardown. Per the protocol, any member may trigger this, not
    /// just the host.
    pub async fn delete_session(&self, session_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.remove(session_id) {
            session.emit(ServerMessage::SessionDeleted);
            tracing::info!(session_id, "session deleted");
        }
    }

    /// Implicit leave on transport close: locate the session containing this
    /// connection, then apply the same semantics as `leave_session`.
    pub async fn disconnect(&self, connection_id: &str) -> LeaveOutcome {
        let session_id = {
            let sessions = self.sessions.read().await;
            sessions
                .values()
                .find(|s| s.contains(connection_id))
                .map(|s| s.id.clone())
        };
        match session_id {
            Some(id) => self.leave_session(&id, connection_id).await,
            None => LeaveOutcome::NotMember,
        }
    }

    /// Echo the host's selected game option to the whole room. Ignored when
    /// the caller is not a member.
    pub async fn game_option_changed(
        &self,
        session_id: &str,
        connection_id: &str,
        game_option: String,
    ) {
        let sessions = self.sessions.read().await;
        if let Some(session) = sessions.get(session_id) {
            if session.contains(connection_id) {
                session.emit(ServerMessage::GameOptionChanged { game_option });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ServerMessage;

    async fn subscribe(state: &AppState, session_id: &str) -> broadcast::Receiver<ServerMessage> {
        state
            .sessions
            .read()
            .await
            .get(session_id)
            .expect("session should exist")
            .channel
            .subscribe()
    }

    /// Drain buffered broadcasts until one matches, panicking when the
    /// channel is empty first.
    fn next_matching(
        rx: &mut broadcast::Receiver<ServerMessage>,
        pred: impl Fn(&ServerMessage) -> bool,
    ) -> ServerMessage {
        loop {
            match rx.try_recv() {
                Ok(msg) if pred(&msg) => return msg,
                Ok(_) => continue,
                Err(e) => panic!("expected broadcast not found: {e}"),
            }
        }
    }

    #[tokio::test]
    async fn test_create_and_check() {
        let state = AppState::new();
        assert_eq!(state.check_session("ABC").await, SessionStatus::NotFound);

        let (host, _rx) = state.create_session("ABC", "conn-h").await;
        assert_eq!(host.role, Role::Host);
        assert_eq!(state.check_session("ABC").await, SessionStatus::Exists);
    }

    #[tokio::test]
    async fn test_recreate_readmits_as_host() {
        let state = AppState::new();
        let (first, _rx1) = state.create_session("ABC", "conn-a").await;
        let (second, _rx2) = state.create_session("ABC", "conn-b").await;
        assert_eq!(second.role, Role::Host);
        assert_ne!(first.id, second.id);

        let sessions = state.sessions.read().await;
        let session = sessions.get("ABC").unwrap();
        assert_eq!(session.host.id, "conn-b");
        assert_eq!(session.participant_count(), 1);
    }

    #[tokio::test]
    async fn test_join_and_user_count() {
        let state = AppState::new();
        let (_, mut host_rx) = state.create_session("ABC", "conn-h").await;
        // Skip the count-1 broadcast from session creation
        while host_rx.try_recv().is_ok() {}

        let (guest, _rx) = state.join_session("ABC", "conn-g").await.unwrap();
        assert_eq!(guest.role, Role::Guest);

        let msg = next_matching(&mut host_rx, |m| {
            matches!(m, ServerMessage::CurrentUsers { .. })
        });
        if let ServerMessage::CurrentUsers { users, count } = msg {
            assert_eq!(count, 2);
            assert_eq!(users.len(), 2);
        }
    }

    #[tokio::test]
    async fn test_join_missing_session() {
        let state = AppState::new();
        let err = state.join_session("NOPE", "conn-g").await.unwrap_err();
        assert_eq!(err, SessionError::NotFound);
    }

    #[tokio::test]
    async fn test_join_full_session() {
        let state = AppState::new();
        state.create_session("ABC", "conn-h").await;
        for i in 0..SESSION_CAPACITY - 1 {
            state
                .join_session("ABC", &format!("conn-{i}"))
                .await
                .unwrap();
        }
        assert_eq!(state.check_session("ABC").await, SessionStatus::Full);
        let err = state.join_session("ABC", "conn-late").await.unwrap_err();
        assert_eq!(err, SessionError::RoomFull);
    }

    #[tokio::test]
    async fn test_host_leave_tears_down() {
        let state = AppState::new();
        state.create_session("ABC", "conn-h").await;
        let (_, mut guest_rx) = state.join_session("ABC", "conn-g").await.unwrap();

        let outcome = state.leave_session("ABC", "conn-h").await;
        assert_eq!(outcome, LeaveOutcome::SessionClosed);
        assert_eq!(state.check_session("ABC").await, SessionStatus::NotFound);

        next_matching(&mut guest_rx, |m| {
            matches!(m, ServerMessage::SessionDeleted)
        });
    }

    #[tokio::test]
    async fn test_guest_leave_withdraws_suggestions() {
        let state = AppState::new();
        state.create_session("ABC", "conn-h").await;
        state.join_session("ABC", "conn-g").await.unwrap();
        state
            .suggest("ABC", "conn-g", "Tacos".to_string())
            .await
            .unwrap();

        let mut rx = subscribe(&state, "ABC").await;
        let outcome = state.leave_session("ABC", "conn-g").await;
        assert_eq!(outcome, LeaveOutcome::GuestLeft);

        let msg = next_matching(&mut rx, |m| {
            matches!(m, ServerMessage::CurrentRestaurants { .. })
        });
        if let ServerMessage::CurrentRestaurants { restaurants } = msg {
            assert!(restaurants.is_empty());
        }

        let sessions = state.sessions.read().await;
        assert_eq!(sessions.get("ABC").unwrap().participant_count(), 1);
    }

    #[tokio::test]
    async fn test_leave_unknown_member() {
        let state = AppState::new();
        state.create_session("ABC", "conn-h").await;
        let outcome = state.leave_session("ABC", "conn-stranger").await;
        assert_eq!(outcome, LeaveOutcome::NotMember);
    }

    #[tokio::test]
    async fn test_disconnect_scans_directory() {
        let state = AppState::new();
        state.create_session("ABC", "conn-h").await;
        state.join_session("ABC", "conn-g").await.unwrap();

        let outcome = state.disconnect("conn-g").await;
        assert_eq!(outcome, LeaveOutcome::GuestLeft);

        let outcome = state.disconnect("conn-h").await;
        assert_eq!(outcome, LeaveOutcome::SessionClosed);
        assert_eq!(state.check_session("ABC").await, SessionStatus::NotFound);
    }

    #[tokio::test]
    async fn test_delete_session_notifies_members() {
        let state = AppState::new();
        state.create_session("XYZ", "conn-h").await;
        let (_, mut g1_rx) = state.join_session("XYZ", "conn-g1").await.unwrap();
        let (_, mut g2_rx) = state.join_session("XYZ", "conn-g2").await.unwrap();

        state.delete_session("XYZ").await;
        next_matching(&mut g1_rx, |m| matches!(m, ServerMessage::SessionDeleted));
        next_matching(&mut g2_rx, |m| matches!(m, ServerMessage::SessionDeleted));
        assert_eq!(state.check_session("XYZ").await, SessionStatus::NotFound);
    }

    #[tokio::test]
    async fn test_game_option_changed_rebroadcast() {
        let state = AppState::new();
        let (_, mut rx) = state.create_session("ABC", "conn-h").await;
        state
            .game_option_changed("ABC", "conn-h", "quick_draw".to_string())
            .await;
        let msg = next_matching(&mut rx, |m| {
            matches!(m, ServerMessage::GameOptionChanged { .. })
        });
        assert_eq!(
            msg,
            ServerMessage::GameOptionChanged {
                game_option: "quick_draw".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_game_option_changed_ignores_strangers() {
        let state = AppState::new();
        let (_, mut rx) = state.create_session("ABC", "conn-h").await;
        while rx.try_recv().is_ok() {}
        state
            .game_option_changed("ABC", "conn-stranger", "spin".to_string())
            .await;
        assert!(rx.try_recv().is_err());
    }
}
