//! Generic mini-game resolution: simultaneous play, quorum-based completion
//! detection, stable ranking, and winner-to-suggestion attribution. Both
//! games share this engine and differ only in ordering direction and score
//! formatting (see `GameKind`).

use super::{AppState, Session};
use crate::error::SessionError;
use crate::protocol::{RankedScore, ServerMessage};
use crate::types::*;

/// Scores collected for one in-flight match. Entries stay in first-submission
/// order; a resubmission overwrites the score in place, so client retries
/// need no protocol-level deduplication.
#[derive(Debug, Default)]
pub struct GameMatch {
    entries: Vec<ScoreEntry>,
}

impl GameMatch {
    pub fn submit(&mut self, participant: &Participant, score: f64) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.participant_id == participant.id)
        {
            entry.score = score;
        } else {
            self.entries.push(ScoreEntry {
                participant_id: participant.id.clone(),
                username: participant.username.clone(),
                score,
            });
        }
    }

    pub fn submitted_count(&self) -> usize {
        self.entries.len()
    }

    pub fn remove(&mut self, participant_id: &str) {
        self.entries.retain(|e| e.participant_id != participant_id);
    }

    /// Best score first. The sort is stable, so equal scores resolve in
    /// submission order.
    pub fn ranking(&self, direction: ScoreDirection) -> Vec<ScoreEntry> {
        let mut ranked = self.entries.clone();
        match direction {
            ScoreDirection::Maximize => ranked.sort_by(|a, b| b.score.total_cmp(&a.score)),
            ScoreDirection::Minimize => ranked.sort_by(|a, b| a.score.total_cmp(&b.score)),
        }
        ranked
    }
}

fn started_message(kind: GameKind) -> ServerMessage {
    match kind {
        GameKind::PlateBalance => ServerMessage::PlateBalanceStarted,
        GameKind::QuickDraw => ServerMessage::QuickDrawStarted,
    }
}

fn winner_message(
    kind: GameKind,
    restaurant: String,
    username: String,
    score: f64,
    ranking: Vec<RankedScore>,
) -> ServerMessage {
    let score = kind.format_score(score);
    match kind {
        GameKind::PlateBalance => ServerMessage::PlateBalanceWinner {
            restaurant,
            username,
            score,
            ranking,
        },
        GameKind::QuickDraw => ServerMessage::QuickDrawWinner {
            restaurant,
            username,
            score,
            ranking,
        },
    }
}

/// Resolve the match if every currently-present participant has submitted.
/// Returns the winner broadcast, or `None` when the quorum is unmet or the
/// winner never suggested a restaurant (the latter resolves silently, by
/// design of the protocol).
fn try_resolve(session: &mut Session, kind: GameKind) -> Option<ServerMessage> {
    let quorum_met = {
        let game_match = session.matches.get(&kind)?;
        game_match.submitted_count() > 0
            && game_match.submitted_count() == session.participant_count()
    };
    if !quorum_met {
        return None;
    }

    let game_match = session.matches.remove(&kind)?;
    let ranked = game_match.ranking(kind.direction());
    let winner = ranked.first()?;
    tracing::info!(
        session_id = %session.id,
        game = ?kind,
        winner = %winner.username,
        "match resolved"
    );

    let winning_suggestion = session
        .suggestions
        .iter()
        .find(|s| s.suggested_by_id == winner.participant_id)?;

    Some(winner_message(
        kind,
        winning_suggestion.restaurant.clone(),
        winner.username.clone(),
        winner.score,
        ranked.iter().map(RankedScore::from).collect(),
    ))
}

/// A participant left mid-match: drop their pending scores and re-check the
/// quorum of every in-flight match against the reduced participant count, so
/// a match never stalls waiting on someone who is already gone.
pub(super) fn handle_departure(session: &mut Session, participant_id: &str) -> Vec<ServerMessage> {
    let kinds: Vec<GameKind> = session.matches.keys().copied().collect();
    let mut resolutions = Vec::new();
    for kind in kinds {
        if let Some(game_match) = session.matches.get_mut(&kind) {
            game_match.remove(participant_id);
        }
        if let Some(msg) = try_resolve(session, kind) {
            resolutions.push(msg);
        }
    }
    resolutions
}

impl AppState {
    /// Host-only: announce the game to the room and arm a fresh match, so
    /// stale scores from an earlier round never leak into this one.
    pub async fn start_game(
        &self,
        session_id: &str,
        connection_id: &str,
        kind: GameKind,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;
        if !session.is_host(connection_id) {
            return Err(SessionError::NotAuthorized("start the game"));
        }
        session.matches.insert(kind, GameMatch::default());
        session.emit(started_message(kind));
        tracing::info!(session_id, game = ?kind, "game started");
        Ok(())
    }

    /// Record a participant's score (latest submission wins) and resolve the
    /// match once everyone currently present has submitted. Non-members are
    /// silently ignored.
    pub async fn submit_score(
        &self,
        session_id: &str,
        connection_id: &str,
        kind: GameKind,
        score: f64,
    ) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(session_id).ok_or(SessionError::NotFound)?;
        let Some(participant) = session.participant(connection_id).cloned() else {
            return Ok(());
        };

        session
            .matches
            .entry(kind)
            .or_default()
            .submit(&participant, score);
        tracing::debug!(session_id, connection_id, game = ?kind, score, "score submitted");

        if let Some(msg) = try_resolve(session, kind) {
            session.emit(msg);
        }
        Ok(())
    }
}
