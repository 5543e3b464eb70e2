use thiserror::Error;

/// Recoverable session-level failures. Every variant is surfaced to the
/// originating connection only, never to the rest of the room, and none is
/// fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Session not found.")]
    NotFound,
    #[error("This session is full.")]
    RoomFull,
    #[error("You have already suggested a restaurant.")]
    AlreadySuggested,
    #[error("Only the host can {0}.")]
    NotAuthorized(&'static str),
    #[error("No restaurants have been suggested yet.")]
    EmptyPool,
}

impl SessionError {
    /// Stable machine-readable code for the protocol `error` payload.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::NotFound => "SESSION_NOT_FOUND",
            SessionError::RoomFull => "ROOM_FULL",
            SessionError::AlreadySuggested => "ALREADY_SUGGESTED",
            SessionError::NotAuthorized(_) => "NOT_AUTHORIZED",
            SessionError::EmptyPool => "EMPTY_POOL",
        }
    }
}
