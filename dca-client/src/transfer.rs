//! File transfer tracking
//!
//! `send_file`/`get_file` return a [`TransferId`] minted by the server; the
//! transfer itself runs server-side and is queried by polling
//! [`crate::DcaClient::get_file_progress`]. The server garbage-collects
//! finished transfers, so an id may stop resolving once the transfer is
//! complete, and it is only meaningful on the connection that minted it.

use serde::{Deserialize, Serialize};

/// Opaque token for an in-progress file transfer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransferId(String);

impl TransferId {
    pub fn new(id: impl Into<String>) -> Self {
        TransferId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransferId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TransferId {
    fn from(id: String) -> Self {
        TransferId(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_id_roundtrip() {
        let id = TransferId::new("xfer-0042");
        assert_eq!(id.as_str(), "xfer-0042");
        assert_eq!(id.to_string(), "xfer-0042");
        assert_eq!(TransferId::from("xfer-0042".to_string()), id);
    }
}
