//! Relay binary: binds the WebSocket listener and serves until ctrl-c.

use clap::Parser;
use sotto_relay::RelayServer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sotto-relay", about = "Store-and-forward relay for sealed Sotto envelopes")]
struct Args {
    /// Socket address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080", env = "SOTTO_RELAY_LISTEN")]
    listen: String,
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let server = RelayServer::bind(&args.listen).await?;
    info!(addr = %server.local_addr()?, "relay listening");

    tokio::select! {
        result = server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown requested");
            Ok(())
        }
    }
}
