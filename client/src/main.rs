use clap::Parser;
use client::game::GameClient;
use log::info;
use tokio::time::{interval, Duration};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:20000")]
    server: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    info!("connecting to {}", args.server);
    let mut client = GameClient::connect(&args.server).await?;

    let mut ticker = interval(Duration::from_millis(50));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                client.handle_messages();
                if client.is_finished() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, leaving the game");
                break;
            }
        }
    }

    if let Some(outcome) = client.game().outcome() {
        info!("result: {} victory", outcome);
    }
    client.stop().await;
    Ok(())
}
