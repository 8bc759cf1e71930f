//! Error types for the SR-IOV exporter.
//!
//! Only discovery failures abort a collection pass. Everything finer grained
//! (a single PF, VF or stat file) is absorbed by the caller, so most variants
//! here end up in a log line rather than in a scrape failure.

use thiserror::Error;

/// Main error type for SR-IOV exporter operations.
#[derive(Debug, Error)]
pub enum SriovError {
    /// PCI device root could not be listed or holds no SR-IOV network PF
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// VFs of a single PF could not be enumerated
    #[error("Failed to enumerate VFs of {pf}: {source}")]
    Enumeration {
        pf: String,
        #[source]
        source: std::io::Error,
    },

    /// Metrics error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// HTTP server error
    #[error("HTTP server error: {0}")]
    Server(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<prometheus::Error> for SriovError {
    fn from(e: prometheus::Error) -> Self {
        SriovError::Metrics(e.to_string())
    }
}

/// Result type alias for SR-IOV exporter operations.
pub type Result<T> = std::result::Result<T, SriovError>;
