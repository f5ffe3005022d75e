use thiserror::Error;

#[derive(Error, Debug)]
pub enum Pop3Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Timed out waiting for client")]
    Timeout,
}

impl Pop3Error {
    /// Whether this error means the client connection itself is unusable
    pub fn is_transport(&self) -> bool {
        matches!(self, Pop3Error::Io(_) | Pop3Error::Timeout)
    }
}

pub type Result<T> = std::result::Result<T, Pop3Error>;
