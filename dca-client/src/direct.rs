//! Direct socket handoff
//!
//! A direct socket is a raw channel to one application on the device,
//! separate from the RPC connection. The server pre-establishes the
//! encrypted tunnel; the client only has to present a one-time token on a
//! fresh connection to the same server socket.
//!
//! Handshake, on a newly opened connection:
//! 1. write the token (from `dca.socket.params`) as the very first bytes
//! 2. read exactly 5 bytes
//! 3. require the literal `good` plus one padding byte
//!
//! After the acknowledgement the stream carries application-defined bytes
//! end-to-end. Callers that manage their own socket (for instance from an
//! embedded language runtime) follow the same steps with the token from
//! [`crate::DcaClient::get_direct_socket_params`].

use crate::{ClientError, Result};
use dca_protocol::DIRECT_SOCKET_ACK;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::time::{timeout, Duration};
use tracing::{debug, warn};

/// Open a direct socket by performing the handshake with `token`
///
/// Connects to the server socket, presents the token, and verifies the
/// acknowledgement. The returned stream is live for application data.
///
/// # Errors
///
/// [`ClientError::Io`] if the connection cannot be opened;
/// [`ClientError::HandshakeFailed`] on a short read, a bad acknowledgement,
/// or a handshake timeout. The socket is dropped on every failure path.
pub async fn open(socket_path: &Path, token: &str, handshake_timeout: Duration) -> Result<UnixStream> {
    debug!("Opening direct socket via {}", socket_path.display());
    let mut stream = UnixStream::connect(socket_path).await?;

    let handshake = async {
        stream.write_all(token.as_bytes()).await?;
        stream.flush().await?;

        let mut ack = [0u8; 5];
        stream.read_exact(&mut ack).await?;
        Ok::<[u8; 5], std::io::Error>(ack)
    };

    let ack = match timeout(handshake_timeout, handshake).await {
        Ok(Ok(ack)) => ack,
        Ok(Err(e)) => {
            warn!("Direct socket handshake failed: {}", e);
            return Err(ClientError::HandshakeFailed(e.to_string()));
        }
        Err(_) => {
            warn!(
                "Direct socket handshake timed out after {:?}",
                handshake_timeout
            );
            return Err(ClientError::HandshakeFailed("handshake timed out".to_string()));
        }
    };

    // Only the first four bytes are significant; the fifth is padding
    if ack[..4] != DIRECT_SOCKET_ACK[..4] {
        warn!("Direct socket refused: unexpected acknowledgement {:?}", ack);
        return Err(ClientError::HandshakeFailed(format!(
            "unexpected acknowledgement: {:?}",
            &ack[..4]
        )));
    }

    debug!("Direct socket established");
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    async fn serve_ack(listener: UnixListener, expected_token: &str, ack: &[u8]) {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; expected_token.len()];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, expected_token.as_bytes());
        stream.write_all(ack).await.unwrap();
        // Keep the stream open so the client sees a clean ack, not EOF
        let mut scratch = [0u8; 1];
        let _ = stream.read(&mut scratch).await;
    }

    #[tokio::test]
    async fn test_handshake_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("direct.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            serve_ack(listener, "tok-0001", b"good\0").await;
        });

        let stream = open(&path, "tok-0001", Duration::from_secs(5)).await;
        assert!(stream.is_ok());
        drop(stream);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_bad_ack() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("direct.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            serve_ack(listener, "tok-0002", b"deny\0").await;
        });

        let err = open(&path, "tok-0002", Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::HandshakeFailed(_)));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("direct.sock");
        let listener = UnixListener::bind(&path).unwrap();

        let server = tokio::spawn(async move {
            // Accept but never acknowledge
            let (_stream, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });

        let err = open(&path, "tok-0003", Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::HandshakeFailed(_)));
        server.abort();
    }

    #[tokio::test]
    async fn test_connect_failure_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.sock");

        let err = open(&path, "tok-0004", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
