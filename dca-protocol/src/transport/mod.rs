//! Transport layer for the DCA client/server socket
//!
//! Defines the [`Transport`] trait the client programs against, so tests can
//! substitute an in-memory fake, and the production [`UnixConnection`] over
//! the server's Unix domain socket.

mod unix;

pub use unix::UnixConnection;

use crate::{Packet, Result};
use async_trait::async_trait;
use std::fmt::Debug;

/// Framed packet stream to the DCA server
///
/// One `Transport` is one socket. The main RPC channel holds exactly one;
/// direct-socket handoffs open their own raw streams and bypass this trait
/// entirely, since their traffic is not packetized.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Send one packet as a single frame
    async fn send_packet(&mut self, packet: &Packet) -> Result<()>;

    /// Receive the next frame and decode it
    ///
    /// Blocks until a full frame arrives or the connection fails. There is
    /// no intrinsic timeout; callers that want one must race this against a
    /// timer and treat the connection as compromised on expiry.
    async fn receive_packet(&mut self) -> Result<Packet>;

    /// Close the connection gracefully
    async fn close(self: Box<Self>) -> Result<()>;

    /// Whether the transport has seen a fatal failure
    fn is_connected(&self) -> bool;
}
