//! Error types for the represence daemon.

use tokio_tungstenite::tungstenite;

/// Failures of the broadcast server. None of these reach the host: the
/// event bridge turns them into log lines or user notifications.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The configured port could not be bound
    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// The listening socket failed after a successful bind
    #[error("{0}")]
    Fault(#[source] std::io::Error),

    /// A single client connection failed
    #[error("Client transport error: {0}")]
    ClientTransport(#[from] tungstenite::Error),

    /// Snapshot could not be encoded
    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Errors that can occur while setting up the reference host
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings or document error
    #[error("Core error: {0}")]
    Core(#[from] represence_core::Error),

    /// File watcher error
    #[error("Watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Broadcast server error
    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

pub type Result<T> = std::result::Result<T, DaemonError>;
