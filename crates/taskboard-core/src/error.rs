use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskboardError {
    /// Malformed draft, patch or sprint. Raised before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Loading tasks or sprints from the remote store failed.
    #[error("Remote read failed: {0}")]
    RemoteRead(String),

    /// The remote store rejected a create, update, move or delete.
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TaskboardError {
    /// Wrap any error as a failed remote read, keeping its message.
    pub fn remote_read(err: impl std::fmt::Display) -> Self {
        Self::RemoteRead(err.to_string())
    }

    /// Wrap any error as a rejected remote write, keeping its message.
    pub fn remote_write(err: impl std::fmt::Display) -> Self {
        Self::RemoteWrite(err.to_string())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_remote_write(&self) -> bool {
        matches!(self, Self::RemoteWrite(_))
    }

    pub fn is_remote_read(&self) -> bool {
        matches!(self, Self::RemoteRead(_))
    }
}
