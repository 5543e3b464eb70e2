use super::{AppState, Session};
use crate::error::SessionError;
use crate::protocol::{ServerMessage, SuggestionInfo};
use crate::types::*;
use rand::Rng;

impl Session {
    /// Withdraw every suggestion attributed to a departing participant.
    pub fn withdraw_suggestions_for(&mut self, participant_id: &str) {
        self.suggestions
            .retain(|s| s.suggested_by_id != participant_id);
    }
}

impl AppState {
    /// Add a suggestion to the session's pool. Hard quota of one suggestion
    /// per participant; callers who are not members are ignored upstream via
    /// the `NotFound` error.
    pub async fn suggest(
        &self,
        session_id: &str,
        connection_id: &str,
        restaurant: String,
    ) -> Result<SuggestionInfo, SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;
        let participant = session
            .participant(connection_id)
            .ok_or(SessionError::NotFound)?;

        if session
            .suggestions
            .iter()
            .any(|s| s.suggested_by_id == participant.id)
        {
            return Err(SessionError::AlreadySuggested);
        }

        let suggestion = Suggestion {
            restaurant,
            suggested_by_id: participant.id.clone(),
            suggested_by: participant.username.clone(),
        };
        let info = SuggestionInfo::from(&suggestion);
        session.suggestions.push(suggestion);
        session.emit(ServerMessage::RestaurantSuggested {
            restaurant: info.clone(),
        });
        tracing::debug!(session_id, connection_id, restaurant = %info.restaurant, "restaurant suggested");
        Ok(info)
    }

    /// Snapshot of the pool for a freshly joined connection.
    pub async fn current_restaurants(&self, session_id: &str) -> Vec<SuggestionInfo> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|s| s.suggestions.iter().map(Into::into).collect())
            .unwrap_or_default()
    }

    /// Uniform random draw over the suggestion pool, host-only. The pool is
    /// not mutated, so repeated spins are independent and may repeat a
    /// previous winner.
    pub async fn spin_wheel(
        &self,
        session_id: &str,
        connection_id: &str,
    ) -> Result<(), SessionError> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(session_id).ok_or(SessionError::NotFound)?;
        if !session.is_host(connection_id) {
            return Err(SessionError::NotAuthorized("spin the wheel"));
        }
        if session.suggestions.is_empty() {
            return Err(SessionError::EmptyPool);
        }

        let index = rand::rng().random_range(0..session.suggestions.len());
        let restaurant = SuggestionInfo::from(&session.suggestions[index]);
        tracing::debug!(session_id, index, restaurant = %restaurant.restaurant, "wheel spun");
        session.emit(ServerMessage::SpinWheel { restaurant, index });
        Ok(())
    }
}
