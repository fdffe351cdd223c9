use anyhow::{Context, Result};
use base64::Engine;
use clap::{Parser, Subcommand};
use dca_client::{ClientConfig, DcaClient, DeviceSelector, TransferId};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "dca")]
#[command(version, about = "Command line client for the Device Companion Agent server")]
struct Cli {
    /// Path of the server socket, overriding the configuration file
    #[arg(long, global = true)]
    socket: Option<PathBuf>,

    /// Configuration file (default: dca/client.toml in the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Target device address. When omitted, the single connected device is
    /// used; with several devices connected an address is required.
    #[arg(long, global = true)]
    device: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List connected devices
    Devices,
    /// Send a message to an application and print its reply
    Ping { app: String, message: String },
    /// Push a file from the desktop to the device
    SendFile {
        app: String,
        local_path: String,
        remote_path: String,
    },
    /// Pull a file from the device to the desktop
    GetFile {
        app: String,
        local_path: String,
        remote_path: String,
    },
    /// Query progress of a running transfer
    Progress { transfer_id: String },
    /// Device battery state
    Battery,
    /// Controller battery state
    ControllerBattery,
    /// Device storage state
    Storage,
    /// General device information
    Info,
    /// Companion-aware applications running on the device
    Apps,
    /// List a directory inside an application's sandboxed root
    Dir { app: String, path: String },
    /// Create a directory inside an application's sandboxed root
    Mkdir { app: String, path: String },
    /// Delete a remote file or directory
    Delete { app: String, path: String },
    /// Move a remote file or directory
    Move {
        app: String,
        from: String,
        to: String,
    },
    /// Copy a remote file or directory
    Copy {
        app: String,
        from: String,
        to: String,
    },
    /// Ask the server to drop its connection to the device
    Disconnect,
    /// Print pairing information for a QR code
    Qr,
    /// Print the agent version on the device
    AgentVersion,
    /// Print the server version
    ServerVersion,
    /// Request a one-time direct socket token and print it
    SocketParams { app: String },
    /// Shut down the server
    KillServer,
}

fn load_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => {
            let default_path = dirs::config_dir().map(|dir| dir.join("dca").join("client.toml"));
            match default_path {
                Some(path) if path.exists() => {
                    debug!("Loading configuration from {}", path.display());
                    ClientConfig::load(&path)
                        .with_context(|| format!("failed to load {}", path.display()))?
                }
                _ => ClientConfig::default(),
            }
        }
    };

    if let Some(socket) = &cli.socket {
        config.socket_path = socket.clone();
    }
    Ok(config)
}

fn print_blob(blob: &[u8]) {
    println!("{}", base64::engine::general_purpose::STANDARD.encode(blob));
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let target = match &cli.device {
        Some(address) => DeviceSelector::address(address.clone()),
        None => DeviceSelector::Auto,
    };

    let client = DcaClient::new(config);
    client
        .connect_to_server()
        .await
        .context("failed to connect to the DCA server")?;

    match cli.command {
        Command::Devices => {
            for device in client.list_devices().await? {
                println!("{}", device);
            }
        }
        Command::Ping { app, message } => {
            let reply = client.send_ping(&app, &message, &target).await?;
            println!("{}", reply);
        }
        Command::SendFile {
            app,
            local_path,
            remote_path,
        } => {
            let transfer = client
                .send_file(&app, &local_path, &remote_path, &target)
                .await?;
            println!("{}", transfer);
        }
        Command::GetFile {
            app,
            local_path,
            remote_path,
        } => {
            let transfer = client
                .get_file(&app, &local_path, &remote_path, &target)
                .await?;
            println!("{}", transfer);
        }
        Command::Progress { transfer_id } => {
            let progress = client
                .get_file_progress(&TransferId::new(transfer_id))
                .await?;
            print_blob(&progress);
        }
        Command::Battery => print_blob(&client.get_device_battery_level(&target).await?),
        Command::ControllerBattery => {
            print_blob(&client.get_controller_battery_level(&target).await?)
        }
        Command::Storage => print_blob(&client.get_storage_info(&target).await?),
        Command::Info => print_blob(&client.get_device_info(&target).await?),
        Command::Apps => print_blob(&client.get_active_applications(&target).await?),
        Command::Dir { app, path } => print_blob(&client.get_dir(&app, &path, &target).await?),
        Command::Mkdir { app, path } => client.make_directory(&app, &path, &target).await?,
        Command::Delete { app, path } => client.delete_file(&app, &path, &target).await?,
        Command::Move { app, from, to } => client.move_file(&app, &from, &to, &target).await?,
        Command::Copy { app, from, to } => client.copy_file(&app, &from, &to, &target).await?,
        Command::Disconnect => client.trigger_disconnect(&target).await?,
        Command::Qr => println!("{}", client.get_qr_code_info().await?),
        Command::AgentVersion => println!("{}", client.get_device_agent_version(&target).await?),
        Command::ServerVersion => println!("{}", client.get_server_version().await?),
        Command::SocketParams { app } => {
            println!("{}", client.get_direct_socket_params(&app, &target).await?)
        }
        Command::KillServer => {
            client.kill_server().await?;
            info!("Kill notification sent");
            return Ok(());
        }
    }

    // Say goodbye so the server drops the connection state promptly
    if let Err(e) = client.hangup().await {
        debug!("Hangup failed (ignored): {}", e);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    run(cli).await
}
