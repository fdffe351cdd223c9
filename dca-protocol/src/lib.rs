//! DCA Wire Protocol
//!
//! Shared wire model for talking to the Device Companion Agent server over
//! its local Unix socket: framed JSON packets with correlation ids, the
//! transport abstraction, and the device records the server reports.

pub mod device;
pub mod packet;
pub mod transport;

mod error;

pub use device::DeviceEntry;
pub use error::{ProtocolError, Result};
pub use packet::{ops, Packet, ResponseBody, RESPONSE_TYPE};
pub use transport::{Transport, UnixConnection};

/// Protocol version spoken on the client/server socket
pub const PROTOCOL_VERSION: u32 = 1;

/// Default Unix socket path of the DCA server
pub const DEFAULT_SOCKET_PATH: &str = "/var/tmp/dcaserver.sock";

/// Exact acknowledgement sent by the server on a direct-socket connection:
/// the literal `good` followed by one padding byte.
pub const DIRECT_SOCKET_ACK: &[u8; 5] = b"good\0";

/// Reserved application identifier addressing the device's shared
/// documents folder instead of an installed application.
pub const DOCUMENTS_APP: &str = "Documents";
