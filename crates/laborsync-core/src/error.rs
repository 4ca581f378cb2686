//! Error types for LaborSync

use thiserror::Error;

/// Main error type for LaborSync operations
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// Input could not be decoded (bad base64url, corrupt deflate stream,
    /// malformed JSON, invalid SDP code, invalid short code)
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A shared code was not found on the relay or the peer connection state
    /// went stale. Distinct from transport failure so UIs can say "this code
    /// expired" instead of "network error".
    #[error("Expired or not found: {0}")]
    Expired(String),

    /// A bounded wait ran out (ICE gathering, data channel open)
    #[error("Timed out: {0}")]
    Timeout(String),

    /// The operation was cancelled and its resources released
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// The peer handshake was driven in an order the state machine forbids
    #[error("Invalid handshake state: {0}")]
    InvalidState(String),

    /// Relay responded with a non-success status other than 404
    #[error("Relay request failed with status {status}: {detail}")]
    Relay { status: u16, detail: String },

    /// Network-level failure talking to the relay
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Peer data channel failed or closed unexpectedly
    #[error("Peer channel error: {0}")]
    PeerChannel(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// QR payload too large or otherwise unencodable
    #[error("QR error: {0}")]
    Qr(String),
}

/// Result type alias using SnapshotError
pub type SnapshotResult<T> = Result<T, SnapshotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SnapshotError::Expired("blue-tiger-42".to_string());
        assert_eq!(format!("{}", err), "Expired or not found: blue-tiger-42");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SnapshotError = io_err.into();
        assert!(matches!(err, SnapshotError::Io(_)));
    }
}
