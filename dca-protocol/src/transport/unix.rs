//! Unix domain socket transport
//!
//! Frames are a 4-byte big-endian length prefix followed by one JSON packet.
//! The length cap guards against a desynchronized or hostile peer.

use crate::{Packet, ProtocolError, Result, Transport};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{timeout, Duration};
use tracing::{debug, error};

/// Maximum frame size (1MB)
const MAX_PACKET_SIZE: usize = 1024 * 1024;

/// Framed packet connection over a Unix domain socket
#[derive(Debug)]
pub struct UnixConnection {
    stream: UnixStream,
    path: PathBuf,
    alive: bool,
}

impl UnixConnection {
    /// Connect to the server socket at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Filesystem path of the server's Unix socket
    /// * `connect_timeout` - How long to wait for the connection to open
    pub async fn connect(path: &Path, connect_timeout: Duration) -> Result<Self> {
        debug!("Connecting to {}", path.display());

        let stream = timeout(connect_timeout, UnixStream::connect(path))
            .await
            .map_err(|_| {
                ProtocolError::Timeout(format!("connecting to {}", path.display()))
            })??;

        debug!("Connected to {}", path.display());

        Ok(Self {
            stream,
            path: path.to_path_buf(),
            alive: true,
        })
    }

    /// Wrap an already-accepted stream (server side of tests)
    pub fn from_stream(stream: UnixStream, path: PathBuf) -> Self {
        Self {
            stream,
            path,
            alive: true,
        }
    }

    /// Socket path this connection is bound to
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write_frame(&mut self, bytes: &[u8]) -> Result<()> {
        let len = bytes.len() as u32;
        self.stream.write_all(&len.to_be_bytes()).await?;
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut len_bytes = [0u8; 4];
        self.stream.read_exact(&mut len_bytes).await?;

        let len = u32::from_be_bytes(len_bytes) as usize;
        if len > MAX_PACKET_SIZE {
            error!("Frame too large: {} bytes", len);
            return Err(ProtocolError::PacketSizeExceeded(len, MAX_PACKET_SIZE));
        }

        let mut data = vec![0u8; len];
        self.stream.read_exact(&mut data).await?;
        Ok(data)
    }
}

#[async_trait]
impl Transport for UnixConnection {
    async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        let bytes = packet.to_bytes()?;
        debug!(
            "Sending packet '{}' ({} bytes) to {}",
            packet.packet_type,
            bytes.len(),
            self.path.display()
        );

        match self.write_frame(&bytes).await {
            Ok(()) => Ok(()),
            Err(ProtocolError::Io(e)) => {
                self.alive = false;
                Err(ProtocolError::from_io_error(e, "sending frame"))
            }
            Err(e) => {
                self.alive = false;
                Err(e)
            }
        }
    }

    async fn receive_packet(&mut self) -> Result<Packet> {
        let data = match self.read_frame().await {
            Ok(data) => data,
            Err(ProtocolError::Io(e)) => {
                self.alive = false;
                return Err(ProtocolError::from_io_error(e, "receiving frame"));
            }
            Err(e) => {
                self.alive = false;
                return Err(e);
            }
        };

        let packet = Packet::from_bytes(&data)?;
        debug!(
            "Received packet '{}' (id {}) from {}",
            packet.packet_type,
            packet.id,
            self.path.display()
        );
        Ok(packet)
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        debug!("Closing connection to {}", self.path.display());
        self.alive = false;
        self.stream.shutdown().await?;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::{ops, ResponseBody};
    use serde_json::json;
    use tokio::net::UnixListener;

    fn test_socket_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("dca-test.sock")
    }

    #[tokio::test]
    async fn test_send_receive_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_socket_path(&dir);
        let listener = UnixListener::bind(&path).unwrap();

        let server_path = path.clone();
        let server_task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut conn = UnixConnection::from_stream(stream, server_path);

            let packet = conn.receive_packet().await.unwrap();
            assert_eq!(packet.packet_type, ops::PING);
            assert_eq!(packet.id, 1);

            let response = Packet::response(packet.id, &ResponseBody::ok(b"pong")).unwrap();
            conn.send_packet(&response).await.unwrap();
        });

        let mut client = UnixConnection::connect(&path, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(client.is_connected());

        let request = Packet::request(1, ops::PING, json!({"message": "hello"}));
        client.send_packet(&request).await.unwrap();

        let response = client.receive_packet().await.unwrap();
        assert_eq!(response.id, 1);
        let body = response.response_body().unwrap();
        assert_eq!(body.payload_string().unwrap(), "pong");

        Box::new(client).close().await.unwrap();
        server_task.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_missing_socket() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_socket_path(&dir);

        let result = UnixConnection::connect(&path, Duration::from_secs(1)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_peer_close_surfaces_connection_closed() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_socket_path(&dir);
        let listener = UnixListener::bind(&path).unwrap();

        let server_task = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            drop(stream);
        });

        let mut client = UnixConnection::connect(&path, Duration::from_secs(5))
            .await
            .unwrap();
        server_task.await.unwrap();

        let err = client.receive_packet().await.unwrap_err();
        assert!(matches!(err, ProtocolError::ConnectionClosed(_)));
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_oversize_frame_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_socket_path(&dir);
        let listener = UnixListener::bind(&path).unwrap();

        let server_task = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            // Advertise a frame larger than the cap
            let len = (MAX_PACKET_SIZE as u32 + 1).to_be_bytes();
            stream.write_all(&len).await.unwrap();
        });

        let mut client = UnixConnection::connect(&path, Duration::from_secs(5))
            .await
            .unwrap();

        let err = client.receive_packet().await.unwrap_err();
        assert!(matches!(err, ProtocolError::PacketSizeExceeded(_, _)));
        server_task.await.unwrap();
    }
}
