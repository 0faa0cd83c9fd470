//! pairwire - peer-to-peer encrypted chat over UDP.
//!
//! One side creates a session and waits, the other joins it:
//!
//! ```text
//! pairwire create
//! pairwire join 203.0.113.7 45000
//! ```
//!
//! Once the handshake completes, lines typed on stdin go to the peer
//! encrypted, and the peer's messages are printed to stdout. Status and
//! diagnostics go to stderr via `tracing` (`RUST_LOG` to adjust).

use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use pairwire::{ChannelConfig, DEFAULT_PORT, SecureChannel, start_as_creator, start_as_joiner};

#[derive(Parser, Debug)]
#[command(name = "pairwire")]
#[command(about = "Serverless, end-to-end encrypted peer-to-peer chat over UDP")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    mode: Mode,

    /// Local address to bind
    #[arg(long, default_value = "127.0.0.1", env = "PAIRWIRE_BIND_HOST")]
    bind_host: String,

    /// Local port to bind (default: 45000 for create, ephemeral for join)
    #[arg(long, env = "PAIRWIRE_BIND_PORT")]
    bind_port: Option<u16>,

    /// Seconds to wait for the peer's handshake
    #[arg(long, default_value_t = 30)]
    handshake_timeout: u64,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Create a session and wait for a peer to join
    Create,
    /// Join a session created at a known address
    Join {
        /// Hostname or IP address of the waiting peer
        host: String,
        /// Port of the waiting peer
        #[arg(default_value_t = DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pairwire=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ChannelConfig {
        handshake_timeout: Duration::from_secs(cli.handshake_timeout),
        ..ChannelConfig::default()
    };

    let channel = match cli.mode {
        Mode::Create => {
            let local = bind_addr(&cli, DEFAULT_PORT).await?;
            info!(%local, "creating session, waiting for a peer");
            start_as_creator(local, config)
                .await
                .context("could not establish session as creator")?
        }
        Mode::Join { ref host, port } => {
            let local = bind_addr(&cli, 0).await?;
            let remote = resolve(host, port)
                .await
                .with_context(|| format!("could not resolve peer '{host}:{port}'"))?;
            info!(%local, %remote, "joining session");
            start_as_joiner(local, remote, config)
                .await
                .context("could not establish session as joiner")?
        }
    };

    info!(peer = %channel.peer_addr(), "session established");
    chat(channel).await
}

/// The local bind address, from options plus a per-mode port default.
async fn bind_addr(cli: &Cli, default_port: u16) -> anyhow::Result<SocketAddr> {
    let port = cli.bind_port.unwrap_or(default_port);
    resolve(&cli.bind_host, port)
        .await
        .with_context(|| format!("could not resolve bind host '{}'", cli.bind_host))
}

/// Resolve a hostname or address literal to a socket address.
async fn resolve(host: &str, port: u16) -> anyhow::Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .context("hostname resolved to no addresses")
}

/// Interactive loop: stdin lines out, decrypted messages in.
async fn chat(mut channel: SecureChannel) -> anyhow::Result<()> {
    let sender = channel.sender();
    let stdin_task = tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.is_empty() {
                continue;
            }
            if sender.send(line.into_bytes()).await.is_err() {
                break;
            }
        }
    });

    loop {
        match channel.recv().await {
            Ok(Some(message)) => println!("{}", String::from_utf8_lossy(&message)),
            Ok(None) => {
                info!("channel closed");
                break;
            }
            Err(e) => {
                stdin_task.abort();
                return Err(e).context("session ended abnormally");
            }
        }
    }

    stdin_task.abort();
    Ok(())
}
