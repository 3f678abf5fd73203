use thiserror::Error;

/// Request-level failures surfaced to callers of the session engine.
#[derive(Error, Debug)]
pub enum SessionsError {
    #[error("Invalid session id: {0}")]
    InvalidId(String),

    #[error("Unknown source type: {0}")]
    UnknownSourceType(String),

    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to load session: {0:#}")]
    Load(#[from] anyhow::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl SessionsError {
    /// Whether the caller sent something the engine cannot route.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SessionsError::InvalidId(_) | SessionsError::UnknownSourceType(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionsError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionsError>;
