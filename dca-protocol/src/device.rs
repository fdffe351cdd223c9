//! Connected device records
//!
//! The server answers `dca.devices` with a JSON array of these records in
//! the response payload. The address doubles as the device identifier in
//! every device-targeted request.

use crate::{ProtocolError, Result};
use serde::{Deserialize, Serialize};

/// One connected device as reported by the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceEntry {
    /// Device address, used as the targeting identifier
    pub address: String,

    /// Human-readable device name
    pub name: String,
}

impl DeviceEntry {
    pub fn new(address: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
        }
    }

    /// Decode the payload of a `dca.devices` response
    pub fn list_from_payload(payload: &[u8]) -> Result<Vec<DeviceEntry>> {
        serde_json::from_slice(payload)
            .map_err(|e| ProtocolError::InvalidPacket(format!("malformed device list: {}", e)))
    }

    /// Encode a device list into a `dca.devices` response payload
    pub fn list_to_payload(devices: &[DeviceEntry]) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(devices)?)
    }
}

impl std::fmt::Display for DeviceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.address)
    }
}
