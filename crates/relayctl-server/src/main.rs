//! relayctl service binary.
//!
//! Reads the configuration, brings up whichever transports are configured,
//! and runs until interrupted. With no transport configured there is
//! nothing to serve and the process exits.

use clap::Parser;
use relayctl_io::SimulatedBank;
use relayctl_server::monitor::spawn_alert_dispatcher;
use relayctl_server::serial::start_serial_session;
use relayctl_server::session::ServerContext;
use relayctl_server::tcp::run_tcp_server;
use relayctl_server::udp::run_udp_server;
use relayctl_server::{Config, ServerError};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "relayctl",
    about = "ASCII relay control and I/O monitoring over serial, TCP, and UDP"
)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the TCP listener port.
    #[arg(long)]
    tcp_port: Option<u16>,

    /// Override the UDP listener port.
    #[arg(long)]
    udp_port: Option<u16>,

    /// Override the serial device, e.g. /dev/ttyUSB0.
    #[arg(long)]
    serial_port: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if args.tcp_port.is_some() {
        config.tcp_port = args.tcp_port;
    }
    if args.udp_port.is_some() {
        config.udp_port = args.udp_port;
    }
    if args.serial_port.is_some() {
        config.serial_port = args.serial_port.clone();
    }

    let (bank, events) = SimulatedBank::new();
    let ctx = Arc::new(ServerContext::new(config, Arc::new(bank)));
    spawn_alert_dispatcher(events, ctx.clone());

    let mut valid_configuration = false;

    match &ctx.config.serial_port {
        Some(port_name) => match start_serial_session(port_name, ctx.config.serial_baud, ctx.clone()) {
            Ok(_) => valid_configuration = true,
            Err(err) => error!("error opening serial port {}: {}", port_name, err),
        },
        None => info!("serial port not configured to be in use"),
    }

    match ctx.config.tcp_port {
        Some(port) => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                if let Err(err) = run_tcp_server(port, ctx).await {
                    error!("tcp server failed: {}", err);
                }
            });
            valid_configuration = true;
        }
        None => info!("tcp server not configured to be in use"),
    }

    match ctx.config.udp_port {
        Some(port) => {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                if let Err(err) = run_udp_server(port, ctx).await {
                    error!("udp server failed: {}", err);
                }
            });
            valid_configuration = true;
        }
        None => info!("udp server not configured to be in use"),
    }

    if !valid_configuration {
        warn!("no transport configured or all failed to start, nothing to do, exiting");
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
