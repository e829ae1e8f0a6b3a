//! Error types for boxscout.

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// DNS-SD daemon error.
    #[error("DNS-SD error: {0}")]
    Dnssd(#[from] mdns_sd::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service resolution error.
    #[error("Resolve error: {0}")]
    Resolve(String),

    /// Discovery provider error.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl Error {
    /// Create a resolution error.
    pub fn resolve<S: Into<String>>(msg: S) -> Self {
        Self::Resolve(msg.into())
    }

    /// Create a provider error.
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        Self::Provider(msg.into())
    }
}
