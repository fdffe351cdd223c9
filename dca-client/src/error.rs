//! Error handling for DCA client operations
//!
//! Every failure is reported as an `Err` value; nothing in the library
//! panics or retries on its own. Resending a non-idempotent operation
//! without knowing whether the original was applied could duplicate side
//! effects, so reconnect-and-retry is left to the caller.

use dca_protocol::packet::{codes, ResponseBody};
use dca_protocol::ProtocolError;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors reported by [`crate::DcaClient`] operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Operation issued before a successful `connect_to_server`
    #[error("not connected to the DCA server")]
    NotConnected,

    /// The server connection failed mid-call or between calls; the client
    /// must reconnect before issuing further requests
    #[error("connection to the DCA server lost: {0}")]
    ConnectionLost(String),

    /// An explicit target device identifier was empty
    #[error("no target device specified")]
    DeviceNotSpecified,

    /// Auto-selection found no connected device
    #[error("no device is connected")]
    NoDeviceConnected,

    /// Auto-selection found more than one connected device
    #[error("{0} devices are connected, a target device must be specified")]
    AmbiguousDevice(usize),

    /// Direct-socket negotiation failed
    #[error("direct socket handshake failed: {0}")]
    HandshakeFailed(String),

    /// The transfer id is unknown, already complete, or expired
    #[error("unknown transfer: {0}")]
    UnknownTransfer(String),

    /// The server or device reported an application-level failure
    #[error("remote error: {0}")]
    Remote(String),

    /// A required string argument was empty
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),

    /// Client configuration could not be loaded
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Wire protocol failure
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O failure outside the packet transport (direct sockets)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Map a failed [`ResponseBody`] to the matching error variant
    pub(crate) fn from_response(body: &ResponseBody) -> Self {
        let message = body
            .message
            .clone()
            .unwrap_or_else(|| "unspecified server error".to_string());

        match body.code.as_deref() {
            Some(codes::UNKNOWN_TRANSFER) => ClientError::UnknownTransfer(message),
            _ => ClientError::Remote(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ClientError::NotConnected.to_string(),
            "not connected to the DCA server"
        );
        assert_eq!(
            ClientError::AmbiguousDevice(3).to_string(),
            "3 devices are connected, a target device must be specified"
        );
        assert_eq!(
            ClientError::MissingArgument("target_app").to_string(),
            "missing required argument: target_app"
        );
    }

    #[test]
    fn test_from_response_unknown_transfer() {
        let body = ResponseBody::fail(codes::UNKNOWN_TRANSFER, "no such transfer: xfer-9");
        let err = ClientError::from_response(&body);
        assert!(matches!(err, ClientError::UnknownTransfer(_)));
        assert!(err.to_string().contains("xfer-9"));
    }

    #[test]
    fn test_from_response_remote_error() {
        let body = ResponseBody::fail(codes::REMOTE_ERROR, "device storage full");
        let err = ClientError::from_response(&body);
        assert!(matches!(err, ClientError::Remote(_)));
    }

    #[test]
    fn test_from_response_without_message() {
        let body = ResponseBody {
            success: false,
            code: None,
            message: None,
            payload: None,
        };
        let err = ClientError::from_response(&body);
        assert!(err.to_string().contains("unspecified"));
    }
}
