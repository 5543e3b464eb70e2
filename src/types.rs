use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type SessionId = String;
pub type ConnectionId = String;

/// Maximum number of participants per session, host included.
pub const SESSION_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Participant {
    pub id: ConnectionId,
    pub username: String,
    pub role: Role,
}

/// A restaurant proposed for a session, attributed to the participant who
/// suggested it. At most one per participant, enforced at insertion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub restaurant: String,
    pub suggested_by_id: ConnectionId,
    pub suggested_by: String,
}

/// Result of a read-only session lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Exists,
    Full,
    NotFound,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    PlateBalance,
    QuickDraw,
}

/// Whether the best score of a match is the highest or the lowest submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreDirection {
    Maximize,
    Minimize,
}

impl GameKind {
    pub fn direction(&self) -> ScoreDirection {
        match self {
            // Longest balance time wins
            GameKind::PlateBalance => ScoreDirection::Maximize,
            // Fastest reaction time wins
            GameKind::QuickDraw => ScoreDirection::Minimize,
        }
    }

    /// Human-readable rendition of a raw millisecond score for the winner
    /// broadcast. Plate balance shows seconds with two decimals, quick draw
    /// shows whole milliseconds.
    pub fn format_score(&self, score_ms: f64) -> String {
        match self {
            GameKind::PlateBalance => format!("{:.2}", score_ms / 1000.0),
            GameKind::QuickDraw => format!("{} ms", score_ms.round() as i64),
        }
    }
}

/// One submitted mini-game score. A match keeps these in first-submission
/// order, which doubles as the tie-breaker when ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreEntry {
    pub participant_id: ConnectionId,
    pub username: String,
    pub score: f64,
}
