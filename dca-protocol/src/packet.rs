//! DCA Network Packet
//!
//! Packets are JSON messages exchanged with the DCA server over a
//! length-prefixed frame (see [`crate::transport`]).
//!
//! Each packet contains:
//! - `id`: correlation id, assigned by the requesting side at send time and
//!   echoed back on the matching response
//! - `type`: packet type in the format `dca.<op>[.<action>]`
//! - `body`: JSON dictionary of operation-specific parameters
//!
//! Responses all use the type [`RESPONSE_TYPE`] and carry a [`ResponseBody`]:
//! a success flag, an optional machine-readable failure code, an optional
//! human-readable message, and an optional opaque payload. The payload is
//! base64-encoded because many operations return binary blobs (serialized
//! battery/storage/device records) that must survive JSON transport.

use crate::{ProtocolError, Result};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Packet type carried by every server response
pub const RESPONSE_TYPE: &str = "dca.response";

/// Request packet types understood by the DCA server
pub mod ops {
    /// List connected devices
    pub const DEVICES: &str = "dca.devices";
    /// Send a short message to an application
    pub const PING: &str = "dca.ping";
    /// Push a file from the desktop to the device
    pub const FILE_SEND: &str = "dca.file.send";
    /// Pull a file from the device to the desktop
    pub const FILE_GET: &str = "dca.file.get";
    /// Query progress of a running transfer
    pub const FILE_PROGRESS: &str = "dca.file.progress";
    /// Delete a remote file or directory
    pub const FILE_DELETE: &str = "dca.file.delete";
    /// Move a remote file or directory
    pub const FILE_MOVE: &str = "dca.file.move";
    /// Copy a remote file or directory
    pub const FILE_COPY: &str = "dca.file.copy";
    /// List a remote directory
    pub const DIR_LIST: &str = "dca.dir.list";
    /// Create a remote directory
    pub const DIR_MAKE: &str = "dca.dir.make";
    /// Device battery state (opaque record)
    pub const INFO_BATTERY: &str = "dca.info.battery";
    /// Controller battery state (opaque record)
    pub const INFO_CONTROLLER: &str = "dca.info.controller";
    /// Device storage state (opaque record)
    pub const INFO_STORAGE: &str = "dca.info.storage";
    /// General device information (opaque record)
    pub const INFO_DEVICE: &str = "dca.info.device";
    /// Running companion-aware applications (opaque record)
    pub const INFO_APPS: &str = "dca.info.apps";
    /// Agent version on the device
    pub const VERSION_AGENT: &str = "dca.version.agent";
    /// Server version on the desktop
    pub const VERSION_SERVER: &str = "dca.version.server";
    /// Pairing information for a QR code
    pub const QR_INFO: &str = "dca.qr";
    /// One-time token for a direct socket handshake
    pub const SOCKET_PARAMS: &str = "dca.socket.params";
    /// Ask the server to drop a device
    pub const DEVICE_DISCONNECT: &str = "dca.device.disconnect";
    /// Graceful goodbye before the client closes its socket
    pub const HANGUP: &str = "dca.hangup";
    /// One-way server shutdown notification, never answered
    pub const SERVER_KILL: &str = "dca.server.kill";
}

/// Failure codes a [`ResponseBody`] may carry in `code`
pub mod codes {
    /// The transfer id is unknown, already complete, or expired
    pub const UNKNOWN_TRANSFER: &str = "unknownTransfer";
    /// The device or application reported an application-level failure
    pub const REMOTE_ERROR: &str = "remoteError";
}

/// A single framed JSON message on the client/server socket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Packet {
    /// Correlation id, echoed verbatim on the response
    pub id: u64,

    /// Packet type in format: dca.<op>[.<action>]
    #[serde(rename = "type")]
    pub packet_type: String,

    /// Operation-specific parameters
    #[serde(default)]
    pub body: Value,
}

impl Packet {
    /// Create a request packet with the given correlation id
    pub fn request(id: u64, packet_type: impl Into<String>, body: Value) -> Self {
        Self {
            id,
            packet_type: packet_type.into(),
            body,
        }
    }

    /// Create a response packet answering the request with correlation id `id`
    pub fn response(id: u64, body: &ResponseBody) -> Result<Self> {
        Ok(Self {
            id,
            packet_type: RESPONSE_TYPE.to_string(),
            body: serde_json::to_value(body)?,
        })
    }

    /// Serialize the packet to JSON bytes (without the frame length prefix)
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_string(self)?.into_bytes())
    }

    /// Deserialize a packet from the bytes of one frame
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidPacket`] if the frame is not valid
    /// JSON or does not conform to the packet structure.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data).map_err(|e| {
            ProtocolError::InvalidPacket(format!("failed to deserialize packet: {}", e))
        })
    }

    /// Check if packet is of a specific type
    pub fn is_type(&self, packet_type: &str) -> bool {
        self.packet_type == packet_type
    }

    /// Interpret the body as a [`ResponseBody`]
    ///
    /// Fails unless the packet type is [`RESPONSE_TYPE`].
    pub fn response_body(&self) -> Result<ResponseBody> {
        if !self.is_type(RESPONSE_TYPE) {
            return Err(ProtocolError::InvalidPacket(format!(
                "expected {} packet, got {}",
                RESPONSE_TYPE, self.packet_type
            )));
        }
        serde_json::from_value(self.body.clone())
            .map_err(|e| ProtocolError::InvalidPacket(format!("malformed response body: {}", e)))
    }

    /// Get a field from the body as a specific type
    pub fn get_body_field<T>(&self, key: &str) -> Option<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.body
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }
}

/// Body of a [`RESPONSE_TYPE`] packet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ResponseBody {
    /// Whether the operation succeeded on the server/device side
    pub success: bool,

    /// Machine-readable failure code (see [`codes`])
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Human-readable diagnostic, present on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Operation result, base64-encoded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl ResponseBody {
    /// Successful response carrying a payload
    pub fn ok(payload: &[u8]) -> Self {
        Self {
            success: true,
            code: None,
            message: None,
            payload: Some(base64::engine::general_purpose::STANDARD.encode(payload)),
        }
    }

    /// Successful response with no payload
    pub fn ok_empty() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    /// Failed response with a code and diagnostic message
    pub fn fail(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code.into()),
            message: Some(message.into()),
            payload: None,
        }
    }

    /// Decode the payload bytes, or an empty vector if none were sent
    pub fn payload_bytes(&self) -> Result<Vec<u8>> {
        match &self.payload {
            Some(encoded) => base64::engine::general_purpose::STANDARD
                .decode(encoded)
                .map_err(|e| {
                    ProtocolError::InvalidPacket(format!("payload is not valid base64: {}", e))
                }),
            None => Ok(Vec::new()),
        }
    }

    /// Decode the payload as UTF-8 text (transfer ids, version strings, tokens)
    pub fn payload_string(&self) -> Result<String> {
        String::from_utf8(self.payload_bytes()?)
            .map_err(|e| ProtocolError::InvalidPacket(format!("payload is not UTF-8: {}", e)))
    }
}
