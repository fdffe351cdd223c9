//! Serialized request channel to the DCA server
//!
//! One `ServerLink` owns the single packet connection. The facade wraps it
//! in a mutex held across each full round trip, so only one request is ever
//! in flight: request bytes cannot interleave and a response can only reach
//! the call that sent the matching request. Correlation ids are still
//! assigned and verified; a mismatch means the stream is desynchronized and
//! poisons the link.
//!
//! A failed link stays failed. Callers see `ConnectionLost` until they
//! explicitly reconnect; nothing here retries or resends, since a resent
//! non-idempotent request could be applied twice.

use crate::{ClientConfig, ClientError, Result};
use dca_protocol::packet::ResponseBody;
use dca_protocol::{Packet, Transport, UnixConnection};
use serde_json::Value;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Connection lifecycle of the RPC channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// The client's single RPC connection plus its state machine
#[derive(Debug)]
pub(crate) struct ServerLink {
    state: LinkState,
    transport: Option<Box<dyn Transport>>,
    next_request_id: u64,
}

impl ServerLink {
    pub(crate) fn new() -> Self {
        Self {
            state: LinkState::Disconnected,
            transport: None,
            next_request_id: 0,
        }
    }

    pub(crate) fn state(&self) -> LinkState {
        self.state
    }

    /// Open the connection to the server socket
    ///
    /// A failed attempt leaves the link Disconnected; the caller may simply
    /// call this again. Only failures after establishment poison the link.
    pub(crate) async fn connect(&mut self, config: &ClientConfig) -> Result<()> {
        if self.state == LinkState::Connected {
            debug!("connect requested but link is already up");
            return Ok(());
        }

        self.state = LinkState::Connecting;
        match UnixConnection::connect(&config.socket_path, config.connect_timeout()).await {
            Ok(conn) => {
                info!("Connected to DCA server at {}", config.socket_path.display());
                self.transport = Some(Box::new(conn));
                self.state = LinkState::Connected;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Failed to connect to DCA server at {}: {}",
                    config.socket_path.display(),
                    e
                );
                self.state = LinkState::Disconnected;
                Err(e.into())
            }
        }
    }

    /// Send one request and block until its response arrives
    ///
    /// Server-side failures are already mapped to error variants; an `Ok`
    /// body always has `success == true`.
    pub(crate) async fn round_trip(
        &mut self,
        op: &str,
        body: Value,
        request_timeout: Option<Duration>,
    ) -> Result<ResponseBody> {
        self.check_usable()?;

        let id = self.next_request_id;
        self.next_request_id += 1;
        let packet = Packet::request(id, op, body);

        // Invariant: Connected implies a live transport
        let transport = match self.transport.as_mut() {
            Some(t) => t,
            None => return Err(ClientError::NotConnected),
        };

        let exchange = async {
            transport.send_packet(&packet).await?;
            transport.receive_packet().await
        };

        let outcome = match request_timeout {
            Some(limit) => match timeout(limit, exchange).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    // The response may still arrive later; it can never be
                    // consumed safely, so the whole link is compromised.
                    warn!("Request '{}' timed out after {:?}", op, limit);
                    self.fail();
                    return Err(ClientError::ConnectionLost(format!(
                        "request '{}' timed out",
                        op
                    )));
                }
            },
            None => exchange.await,
        };

        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                warn!("Request '{}' failed on the wire: {}", op, e);
                self.fail();
                return Err(ClientError::ConnectionLost(e.to_string()));
            }
        };

        if response.id != id {
            warn!(
                "Correlation mismatch: sent id {}, received id {}",
                id, response.id
            );
            self.fail();
            return Err(ClientError::ConnectionLost(format!(
                "correlation mismatch: sent {}, received {}",
                id, response.id
            )));
        }

        let body = match response.response_body() {
            Ok(body) => body,
            Err(e) => {
                self.fail();
                return Err(ClientError::ConnectionLost(e.to_string()));
            }
        };

        if body.success {
            Ok(body)
        } else {
            debug!(
                "Request '{}' refused by server: {:?} {:?}",
                op, body.code, body.message
            );
            Err(ClientError::from_response(&body))
        }
    }

    /// Send a notification and do not wait for any response
    ///
    /// Send failures are swallowed: the only one-way operation is the
    /// server kill, whose success can only be observed by later calls
    /// failing anyway.
    pub(crate) async fn send_one_way(&mut self, op: &str, body: Value) -> Result<()> {
        self.check_usable()?;

        let id = self.next_request_id;
        self.next_request_id += 1;
        let packet = Packet::request(id, op, body);

        if let Some(transport) = self.transport.as_mut() {
            if let Err(e) = transport.send_packet(&packet).await {
                debug!("One-way '{}' send failed (ignored): {}", op, e);
            }
        }
        Ok(())
    }

    /// Close the connection gracefully and return to Disconnected
    pub(crate) async fn disconnect(&mut self) -> Result<()> {
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("Error closing connection (ignored): {}", e);
            }
        }
        self.state = LinkState::Disconnected;
        Ok(())
    }

    /// Poison the link; every subsequent call fails with `ConnectionLost`
    /// until `connect` succeeds again
    pub(crate) fn fail(&mut self) {
        self.state = LinkState::Failed;
        self.transport = None;
    }

    fn check_usable(&self) -> Result<()> {
        match self.state {
            LinkState::Connected => Ok(()),
            LinkState::Failed => Err(ClientError::ConnectionLost(
                "connection previously failed".to_string(),
            )),
            LinkState::Disconnected | LinkState::Connecting => Err(ClientError::NotConnected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dca_protocol::{ProtocolError, Result as ProtocolResult};
    use serde_json::json;

    #[derive(Debug)]
    enum FakeMode {
        /// Answer every request with this body, echoing the request id
        Reply(ResponseBody),
        /// Answer with a wrong correlation id
        WrongId(ResponseBody),
        /// Never produce a response
        Hang,
        /// Fail the receive as if the peer closed
        CloseOnReceive,
    }

    #[derive(Debug)]
    struct FakeTransport {
        mode: FakeMode,
        last_id: Option<u64>,
        alive: bool,
    }

    impl FakeTransport {
        fn new(mode: FakeMode) -> Self {
            Self {
                mode,
                last_id: None,
                alive: true,
            }
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send_packet(&mut self, packet: &Packet) -> ProtocolResult<()> {
            self.last_id = Some(packet.id);
            Ok(())
        }

        async fn receive_packet(&mut self) -> ProtocolResult<Packet> {
            let id = self.last_id.unwrap_or(0);
            match &self.mode {
                FakeMode::Reply(body) => Packet::response(id, body),
                FakeMode::WrongId(body) => Packet::response(id + 7, body),
                FakeMode::Hang => std::future::pending().await,
                FakeMode::CloseOnReceive => {
                    self.alive = false;
                    Err(ProtocolError::ConnectionClosed("peer closed".to_string()))
                }
            }
        }

        async fn close(self: Box<Self>) -> ProtocolResult<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            self.alive
        }
    }

    fn link_with(mode: FakeMode) -> ServerLink {
        ServerLink {
            state: LinkState::Connected,
            transport: Some(Box::new(FakeTransport::new(mode))),
            next_request_id: 0,
        }
    }

    #[tokio::test]
    async fn test_round_trip_before_connect_fails_fast() {
        let mut link = ServerLink::new();
        let err = link
            .round_trip("dca.devices", json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }

    #[tokio::test]
    async fn test_round_trip_success() {
        let mut link = link_with(FakeMode::Reply(ResponseBody::ok(b"pong")));
        let body = link.round_trip("dca.ping", json!({}), None).await.unwrap();
        assert_eq!(body.payload_string().unwrap(), "pong");
    }

    #[tokio::test]
    async fn test_correlation_ids_increase() {
        let mut link = link_with(FakeMode::Reply(ResponseBody::ok_empty()));
        link.round_trip("dca.ping", json!({}), None).await.unwrap();
        link.round_trip("dca.ping", json!({}), None).await.unwrap();
        assert_eq!(link.next_request_id, 2);
    }

    #[tokio::test]
    async fn test_wrong_correlation_id_poisons_link() {
        let mut link = link_with(FakeMode::WrongId(ResponseBody::ok_empty()));
        let err = link
            .round_trip("dca.ping", json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ConnectionLost(_)));
        assert_eq!(link.state(), LinkState::Failed);

        // Subsequent calls fail fast with ConnectionLost
        let err = link
            .round_trip("dca.ping", json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ConnectionLost(_)));
    }

    #[tokio::test]
    async fn test_timeout_poisons_link() {
        let mut link = link_with(FakeMode::Hang);
        let err = link
            .round_trip("dca.ping", json!({}), Some(Duration::from_millis(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ConnectionLost(_)));
        assert_eq!(link.state(), LinkState::Failed);
    }

    #[tokio::test]
    async fn test_peer_close_poisons_link() {
        let mut link = link_with(FakeMode::CloseOnReceive);
        let err = link
            .round_trip("dca.ping", json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::ConnectionLost(_)));
        assert_eq!(link.state(), LinkState::Failed);
    }

    #[tokio::test]
    async fn test_server_failure_does_not_poison_link() {
        let mut link = link_with(FakeMode::Reply(ResponseBody::fail(
            "remoteError",
            "device storage full",
        )));
        let err = link
            .round_trip("dca.file.send", json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Remote(_)));
        // An application-level refusal leaves the connection usable
        assert_eq!(link.state(), LinkState::Connected);
    }

    #[tokio::test]
    async fn test_disconnect_returns_to_disconnected() {
        let mut link = link_with(FakeMode::Reply(ResponseBody::ok_empty()));
        link.disconnect().await.unwrap();
        assert_eq!(link.state(), LinkState::Disconnected);

        let err = link
            .round_trip("dca.ping", json!({}), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
    }
}
