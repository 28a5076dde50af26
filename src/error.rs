/* src/error.rs */

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZoneError>;

#[derive(Debug, Error)]
pub enum ZoneError {
    /// Malformed FQDN or SOA content.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Ancestor or bulk target missing at action time.
    #[error("zone not found: {0}")]
    NotFound(String),

    /// Storage or network failure reported by a backend.
    #[error("backend error: {0}")]
    Backend(String),

    #[error("cascade partially failed: {failed} of {total} targets failed")]
    PartialCascadeFailure { failed: usize, total: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl ZoneError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
