use clap::Parser;
use client::network::{Client, ClientOptions};
use log::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Display name shown in the roster
    #[arg(short = 'n', long, default_value = "player")]
    name: String,

    /// Let the bot policy steer our snake
    #[arg(short = 'a', long)]
    autopilot: bool,

    /// Join again whenever our snake dies
    #[arg(short = 'r', long)]
    rejoin: bool,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting client...");
    info!("Connecting to: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }
    if !args.autopilot {
        info!("Controls: w/a/s/d then Enter to turn, 'join', 'leave', 'quit'");
    }

    let options = ClientOptions {
        name: args.name,
        autopilot: args.autopilot,
        rejoin: args.rejoin,
        fake_ping_ms: args.fake_ping,
    };
    let mut client = Client::new(&args.server, options).await?;

    tokio::select! {
        result = client.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    Ok(())
}
