use thiserror::Error;

/// Top-level error type for the mindr client core.
///
/// Each variant maps to one failure class of the system. Subsystem crates
/// return `MindrError` directly or convert into it with `From` so that the
/// `?` operator works across crate boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MindrError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// No identity is signed in. Blocks sending; blocks nothing else.
    #[error("No signed-in identity")]
    AuthUnavailable,

    /// The identity provider failed to issue a token.
    #[error("Token issuance failed: {0}")]
    TokenIssuance(String),

    /// The platform has no speech-recognition capability.
    #[error("Speech recognition is not supported on this device")]
    UnsupportedDevice,

    #[error("Speech channel error: {0}")]
    Speech(String),

    /// The calendar service rejected the credential. Never auto-retried.
    #[error("Calendar credential expired or revoked")]
    CredentialExpired,

    /// Non-2xx response with a server-reported message.
    #[error("Backend error ({status}): {message}")]
    Backend { status: u16, message: String },

    /// Transport failure: no response was reachable at all.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for MindrError {
    fn from(err: toml::de::Error) -> Self {
        MindrError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MindrError {
    fn from(err: toml::ser::Error) -> Self {
        MindrError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MindrError {
    fn from(err: serde_json::Error) -> Self {
        MindrError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MindrError>;
