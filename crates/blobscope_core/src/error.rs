use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Key enumeration failed: {0}")]
    Enumeration(String),

    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Value fetch failed: {0}")]
    Fetch(String),

    #[error("Value could not be decoded as {viewer}: {message}")]
    Decode {
        viewer: &'static str,
        message: String,
    },

    #[error("Invalid cache location: {0}")]
    InvalidLocation(String),

    #[error("Operation not supported: {0}")]
    NotSupported(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CacheError {
    pub fn enumeration(message: impl Into<String>) -> Self {
        Self::Enumeration(message.into())
    }

    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch(message.into())
    }
}
