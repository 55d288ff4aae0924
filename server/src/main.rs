use clap::Parser;
use log::{error, info};
use server::game::{GameServer, DEFAULT_LEVEL};
use server::network::NetServer;
use shared::Level;
use std::path::PathBuf;
use tokio::time::Duration;

/// Command line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value = "20000")]
    port: u16,
    /// Level file to serve instead of the built-in arena
    #[clap(short, long)]
    level: Option<PathBuf>,
    /// Dispatch cadence in milliseconds
    #[clap(short, long, default_value = "50")]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let level = match &args.level {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Level::from_text(1, &text)?
        }
        None => Level::from_text(1, DEFAULT_LEVEL)?,
    };
    info!(
        "serving level {} ({}x{})",
        level.number(),
        level.width(),
        level.height()
    );

    let address = format!("{}:{}", args.host, args.port);
    let mut net = NetServer::bind(&address).await?;
    net.start();

    let mut game = GameServer::new(net, level);
    let tick = Duration::from_millis(args.tick_ms);

    tokio::select! {
        _ = game.run(tick) => {
            error!("dispatch loop exited unexpectedly");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down");
        }
    }

    game.stop().await;
    Ok(())
}
