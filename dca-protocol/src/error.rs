//! Error handling for the DCA wire protocol
//!
//! Covers framing, serialization, and socket failures on the client/server
//! connection. Underlying library errors convert automatically via `thiserror`.

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors that can occur on the wire to the DCA server
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// I/O error on the socket
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed or unexpected packet
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),

    /// Frame exceeds the maximum allowed size
    #[error("Packet size exceeded: {0} bytes (max: {1})")]
    PacketSizeExceeded(usize, usize),

    /// Read or write did not complete within the transport timeout
    #[error("Transport timeout: {0}")]
    Timeout(String),

    /// The peer closed the connection
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),
}

impl ProtocolError {
    /// Refine a generic I/O error into a more specific variant where the
    /// error kind allows it.
    pub fn from_io_error(error: std::io::Error, context: &str) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::TimedOut => ProtocolError::Timeout(format!("{}: {}", context, error)),
            ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe => {
                ProtocolError::ConnectionClosed(format!("{}: {}", context, error))
            }
            _ => ProtocolError::Io(error),
        }
    }
}
