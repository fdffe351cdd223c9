//! DCA Desktop Client
//!
//! Client library for the Device Companion Agent (DCA): the background
//! server process that bridges this desktop to paired augmented-reality
//! devices. The client speaks framed JSON packets over the server's local
//! Unix socket, one request in flight at a time, and exposes one method per
//! server operation: device listing, application ping, file transfer with
//! polled progress, remote file management, info queries, and direct-socket
//! tunneling to a device application.
//!
//! ```rust,no_run
//! use dca_client::{ClientConfig, DcaClient, DeviceSelector};
//!
//! # async fn example() -> dca_client::Result<()> {
//! let client = DcaClient::new(ClientConfig::default());
//! client.connect_to_server().await?;
//!
//! for device in client.list_devices().await? {
//!     println!("{}", device);
//! }
//!
//! let reply = client
//!     .send_ping("com.example.viewer", "hello", &DeviceSelector::Auto)
//!     .await?;
//! println!("application answered: {}", reply);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod device;
pub mod direct;
pub mod transfer;

mod channel;
mod error;

pub use client::DcaClient;
pub use config::ClientConfig;
pub use device::DeviceSelector;
pub use error::{ClientError, Result};
pub use transfer::TransferId;

pub use dca_protocol::{DeviceEntry, DEFAULT_SOCKET_PATH, DOCUMENTS_APP};
