//! Client facade
//!
//! `DcaClient` exposes one method per server operation. Every data-bearing
//! method is a thin mapping onto one request/response round trip through
//! the serialized link; device-targeted methods resolve their
//! [`DeviceSelector`] at send time, under the same lock as the request
//! itself.

use crate::channel::{LinkState, ServerLink};
use crate::{direct, ClientConfig, ClientError, DeviceSelector, Result, TransferId};
use dca_protocol::packet::{ops, ResponseBody};
use dca_protocol::DeviceEntry;
use serde_json::{json, Value};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Client handle for one connection to the DCA server
///
/// Methods may be called concurrently from multiple tasks; they serialize
/// internally so only one request is in flight on the shared connection.
/// Direct-socket handoffs open their own connection and do not contend
/// with in-flight requests.
#[derive(Debug)]
pub struct DcaClient {
    config: ClientConfig,
    link: Mutex<ServerLink>,
}

impl DcaClient {
    /// Create a client; no connection is opened until
    /// [`connect_to_server`](Self::connect_to_server)
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            link: Mutex::new(ServerLink::new()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Connect to the local DCA server. Must succeed before any other
    /// operation; there is no implicit reconnection afterwards.
    pub async fn connect_to_server(&self) -> Result<()> {
        self.link.lock().await.connect(&self.config).await
    }

    /// Whether the RPC connection is currently established
    pub async fn is_connected(&self) -> bool {
        self.link.lock().await.state() == LinkState::Connected
    }

    /// List all connected devices with their addresses
    pub async fn list_devices(&self) -> Result<Vec<DeviceEntry>> {
        debug!("Listing connected devices");
        let body = self.request(ops::DEVICES, json!({})).await?;
        Ok(DeviceEntry::list_from_payload(&body.payload_bytes()?)?)
    }

    /// Send a short message to an application and return its reply
    pub async fn send_ping(
        &self,
        target_app: &str,
        message: &str,
        target: &DeviceSelector,
    ) -> Result<String> {
        require("target_app", target_app)?;
        info!("Sending ping to {} on {}", target_app, target);

        let body = self
            .targeted_request(
                ops::PING,
                target,
                json!({ "app": target_app, "message": message }),
            )
            .await?;
        Ok(body.payload_string()?)
    }

    /// Send a file from the desktop to the device
    ///
    /// `target_app` may be [`crate::DOCUMENTS_APP`] to address the device's
    /// shared documents folder. Returns the id for polling
    /// [`get_file_progress`](Self::get_file_progress); the transfer itself
    /// continues server-side.
    pub async fn send_file(
        &self,
        target_app: &str,
        local_path: &str,
        remote_path: &str,
        target: &DeviceSelector,
    ) -> Result<TransferId> {
        require("target_app", target_app)?;
        require("local_path", local_path)?;
        require("remote_path", remote_path)?;
        info!(
            "Sending {} to {}:{} on {}",
            local_path, target_app, remote_path, target
        );

        let body = self
            .targeted_request(
                ops::FILE_SEND,
                target,
                json!({
                    "app": target_app,
                    "localPath": local_path,
                    "remotePath": remote_path,
                }),
            )
            .await?;
        Ok(TransferId::new(body.payload_string()?))
    }

    /// Pull a file from the device to the desktop
    pub async fn get_file(
        &self,
        target_app: &str,
        local_path: &str,
        remote_path: &str,
        target: &DeviceSelector,
    ) -> Result<TransferId> {
        require("target_app", target_app)?;
        require("local_path", local_path)?;
        require("remote_path", remote_path)?;
        info!(
            "Fetching {}:{} to {} on {}",
            target_app, remote_path, local_path, target
        );

        let body = self
            .targeted_request(
                ops::FILE_GET,
                target,
                json!({
                    "app": target_app,
                    "localPath": local_path,
                    "remotePath": remote_path,
                }),
            )
            .await?;
        Ok(TransferId::new(body.payload_string()?))
    }

    /// Query progress of a running transfer
    ///
    /// The payload format is owned by the server (percentage or byte
    /// counts); this client passes it through uninterpreted. An id the
    /// server no longer tracks yields [`ClientError::UnknownTransfer`].
    pub async fn get_file_progress(&self, transfer: &TransferId) -> Result<Vec<u8>> {
        debug!("Querying progress of transfer {}", transfer);
        let body = self
            .request(ops::FILE_PROGRESS, json!({ "transferId": transfer }))
            .await?;
        Ok(body.payload_bytes()?)
    }

    /// Device battery state as an opaque serialized record
    pub async fn get_device_battery_level(&self, target: &DeviceSelector) -> Result<Vec<u8>> {
        self.opaque_query(ops::INFO_BATTERY, target).await
    }

    /// Controller battery state as an opaque serialized record
    pub async fn get_controller_battery_level(&self, target: &DeviceSelector) -> Result<Vec<u8>> {
        self.opaque_query(ops::INFO_CONTROLLER, target).await
    }

    /// Device storage state as an opaque serialized record
    pub async fn get_storage_info(&self, target: &DeviceSelector) -> Result<Vec<u8>> {
        self.opaque_query(ops::INFO_STORAGE, target).await
    }

    /// General device information as an opaque serialized record
    pub async fn get_device_info(&self, target: &DeviceSelector) -> Result<Vec<u8>> {
        self.opaque_query(ops::INFO_DEVICE, target).await
    }

    /// Companion-aware applications running on the device, as an opaque
    /// serialized record
    pub async fn get_active_applications(&self, target: &DeviceSelector) -> Result<Vec<u8>> {
        self.opaque_query(ops::INFO_APPS, target).await
    }

    /// List a directory inside the application's sandboxed root
    ///
    /// `remote_path` is passed through unchanged; the server prefixes and
    /// confines it to the application's readable area.
    pub async fn get_dir(
        &self,
        target_app: &str,
        remote_path: &str,
        target: &DeviceSelector,
    ) -> Result<Vec<u8>> {
        require("target_app", target_app)?;
        require("remote_path", remote_path)?;
        debug!("Listing {}:{} on {}", target_app, remote_path, target);

        let body = self
            .targeted_request(
                ops::DIR_LIST,
                target,
                json!({ "app": target_app, "path": remote_path }),
            )
            .await?;
        Ok(body.payload_bytes()?)
    }

    /// Create a directory inside the application's sandboxed root
    pub async fn make_directory(
        &self,
        target_app: &str,
        remote_path: &str,
        target: &DeviceSelector,
    ) -> Result<()> {
        require("target_app", target_app)?;
        require("remote_path", remote_path)?;
        info!("Creating {}:{} on {}", target_app, remote_path, target);

        self.targeted_request(
            ops::DIR_MAKE,
            target,
            json!({ "app": target_app, "path": remote_path }),
        )
        .await?;
        Ok(())
    }

    /// Delete a file or directory inside the application's sandboxed root
    pub async fn delete_file(
        &self,
        target_app: &str,
        remote_path: &str,
        target: &DeviceSelector,
    ) -> Result<()> {
        require("target_app", target_app)?;
        require("remote_path", remote_path)?;
        info!("Deleting {}:{} on {}", target_app, remote_path, target);

        self.targeted_request(
            ops::FILE_DELETE,
            target,
            json!({ "app": target_app, "path": remote_path }),
        )
        .await?;
        Ok(())
    }

    /// Move a file or directory within the application's sandboxed root
    pub async fn move_file(
        &self,
        target_app: &str,
        remote_path_from: &str,
        remote_path_to: &str,
        target: &DeviceSelector,
    ) -> Result<()> {
        require("target_app", target_app)?;
        require("remote_path_from", remote_path_from)?;
        require("remote_path_to", remote_path_to)?;
        info!(
            "Moving {}:{} to {} on {}",
            target_app, remote_path_from, remote_path_to, target
        );

        self.targeted_request(
            ops::FILE_MOVE,
            target,
            json!({
                "app": target_app,
                "from": remote_path_from,
                "to": remote_path_to,
            }),
        )
        .await?;
        Ok(())
    }

    /// Copy a file or directory within the application's sandboxed root
    pub async fn copy_file(
        &self,
        target_app: &str,
        remote_path_from: &str,
        remote_path_to: &str,
        target: &DeviceSelector,
    ) -> Result<()> {
        require("target_app", target_app)?;
        require("remote_path_from", remote_path_from)?;
        require("remote_path_to", remote_path_to)?;
        info!(
            "Copying {}:{} to {} on {}",
            target_app, remote_path_from, remote_path_to, target
        );

        self.targeted_request(
            ops::FILE_COPY,
            target,
            json!({
                "app": target_app,
                "from": remote_path_from,
                "to": remote_path_to,
            }),
        )
        .await?;
        Ok(())
    }

    /// Ask the server to drop its connection to a device
    pub async fn trigger_disconnect(&self, target: &DeviceSelector) -> Result<()> {
        info!("Requesting disconnect of {}", target);
        self.targeted_request(ops::DEVICE_DISCONNECT, target, json!({}))
            .await?;
        Ok(())
    }

    /// Pairing information to render as a QR code
    pub async fn get_qr_code_info(&self) -> Result<String> {
        debug!("Fetching pairing info");
        let body = self.request(ops::QR_INFO, json!({})).await?;
        Ok(body.payload_string()?)
    }

    /// Version of the agent running on the target device
    pub async fn get_device_agent_version(&self, target: &DeviceSelector) -> Result<String> {
        debug!("Fetching agent version of {}", target);
        let body = self.targeted_request(ops::VERSION_AGENT, target, json!({})).await?;
        Ok(body.payload_string()?)
    }

    /// Version of the server running on this desktop
    pub async fn get_server_version(&self) -> Result<String> {
        debug!("Fetching server version");
        let body = self.request(ops::VERSION_SERVER, json!({})).await?;
        Ok(body.payload_string()?)
    }

    /// One-time handshake token for a caller-managed direct socket
    ///
    /// The caller opens its own connection to the server socket, writes the
    /// token as the very first bytes, and reads the 5-byte acknowledgement
    /// (see [`crate::direct`]). The token is consumed by the first
    /// connection that presents it.
    pub async fn get_direct_socket_params(
        &self,
        target_app: &str,
        target: &DeviceSelector,
    ) -> Result<String> {
        require("target_app", target_app)?;
        info!("Requesting direct socket to {} on {}", target_app, target);

        let body = self
            .targeted_request(ops::SOCKET_PARAMS, target, json!({ "app": target_app }))
            .await?;
        Ok(body.payload_string()?)
    }

    /// Open a ready-to-use direct socket to an application on the device
    ///
    /// Performs the whole handshake internally and returns the owned
    /// stream; the tunnel beyond the server is already encrypted. The
    /// handshake runs on its own connection and may proceed concurrently
    /// with RPC requests.
    pub async fn get_direct_socket(
        &self,
        target_app: &str,
        target: &DeviceSelector,
    ) -> Result<UnixStream> {
        let token = self.get_direct_socket_params(target_app, target).await?;
        direct::open(
            &self.config.socket_path,
            &token,
            self.config.handshake_timeout(),
        )
        .await
    }

    /// Disconnect from the server gracefully
    pub async fn hangup(&self) -> Result<()> {
        info!("Hanging up");
        let mut link = self.link.lock().await;
        link.round_trip(ops::HANGUP, json!({}), self.config.request_timeout())
            .await?;
        link.disconnect().await
    }

    /// Kill the connected server
    ///
    /// Fire-and-forget: no response is awaited and the call succeeds
    /// locally regardless of the server's fate. The connection is
    /// considered lost afterwards; any later call fails until a fresh
    /// [`connect_to_server`](Self::connect_to_server) against a new server.
    pub async fn kill_server(&self) -> Result<()> {
        info!("Sending server kill notification");
        let mut link = self.link.lock().await;
        link.send_one_way(ops::SERVER_KILL, json!({})).await?;
        link.fail();
        Ok(())
    }

    /// One round trip for an untargeted operation
    async fn request(&self, op: &str, body: Value) -> Result<ResponseBody> {
        let mut link = self.link.lock().await;
        link.round_trip(op, body, self.config.request_timeout())
            .await
    }

    /// Resolve the target, then issue the request, all under one lock so
    /// resolution and use cannot interleave with other callers
    async fn targeted_request(
        &self,
        op: &str,
        target: &DeviceSelector,
        mut body: Value,
    ) -> Result<ResponseBody> {
        let mut link = self.link.lock().await;
        let device = self.resolve_target(&mut link, target).await?;
        if let Value::Object(map) = &mut body {
            map.insert("device".to_string(), Value::String(device));
        }
        link.round_trip(op, body, self.config.request_timeout())
            .await
    }

    /// Device-targeted query returning an opaque payload
    async fn opaque_query(&self, op: &str, target: &DeviceSelector) -> Result<Vec<u8>> {
        debug!("Querying {} on {}", op, target);
        let body = self.targeted_request(op, target, json!({})).await?;
        Ok(body.payload_bytes()?)
    }

    async fn resolve_target(
        &self,
        link: &mut ServerLink,
        target: &DeviceSelector,
    ) -> Result<String> {
        match target {
            DeviceSelector::Address(addr) if addr.is_empty() => {
                Err(ClientError::DeviceNotSpecified)
            }
            DeviceSelector::Address(addr) => Ok(addr.clone()),
            DeviceSelector::Auto => {
                let body = link
                    .round_trip(ops::DEVICES, json!({}), self.config.request_timeout())
                    .await?;
                let mut devices = DeviceEntry::list_from_payload(&body.payload_bytes()?)?;
                match devices.len() {
                    0 => Err(ClientError::NoDeviceConnected),
                    1 => {
                        let device = devices.remove(0);
                        debug!("Auto-selected device {}", device);
                        Ok(device.address)
                    }
                    n => Err(ClientError::AmbiguousDevice(n)),
                }
            }
        }
    }
}

fn require(name: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        Err(ClientError::MissingArgument(name))
    } else {
        Ok(())
    }
}
