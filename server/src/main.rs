use clap::Parser;
use log::{error, info, warn};
use server::game::ServerGame;
use server::network::{Server, ServerMessage};
use shared::GameConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Authoritative snake arena server")]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of connected clients
    #[arg(short, long, default_value = "32")]
    max_clients: usize,

    #[arg(long, default_value_t = shared::config::DEFAULT_BOARD_WIDTH)]
    width: i32,

    #[arg(long, default_value_t = shared::config::DEFAULT_BOARD_HEIGHT)]
    height: i32,

    /// Apples kept on the board
    #[arg(long, default_value_t = shared::config::DEFAULT_DESIRED_APPLES)]
    apples: usize,

    #[arg(long, default_value_t = shared::config::DEFAULT_OBSTACLE_COUNT)]
    obstacles: usize,

    /// Bots are added while fewer snakes than this are alive
    #[arg(long, default_value_t = shared::config::DEFAULT_MIN_SNAKES)]
    min_snakes: usize,

    #[arg(long, default_value_t = shared::config::DEFAULT_START_SIZE)]
    start_size: usize,

    /// Cells gained per apple
    #[arg(long, default_value_t = shared::config::DEFAULT_GROWTH_BONUS)]
    growth: usize,

    /// Milliseconds per turn
    #[arg(short, long, default_value_t = shared::config::DEFAULT_TICK_MS)]
    tick_ms: u64,

    /// Seed for world generation, spawns and bots
    #[arg(long)]
    seed: Option<u64>,

    /// Start with the tick timer paused
    #[arg(long)]
    paused: bool,
}

impl Args {
    fn game_config(&self) -> GameConfig {
        GameConfig {
            width: self.width,
            height: self.height,
            desired_apples: self.apples,
            obstacle_count: self.obstacles,
            min_snakes: self.min_snakes,
            start_size: self.start_size,
            growth_bonus: self.growth,
            tick_duration_ms: self.tick_ms,
            ..GameConfig::default()
        }
    }
}

/// Reads operator commands from stdin: `pause` toggles the tick timer,
/// `quit` shuts the server down.
fn spawn_console(control: mpsc::UnboundedSender<ServerMessage>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            let message = match lines.next_line().await {
                Ok(Some(line)) => match line.trim() {
                    "pause" => ServerMessage::TogglePause,
                    "quit" => ServerMessage::Shutdown,
                    "" => continue,
                    other => {
                        warn!("Unknown command '{}', expected 'pause' or 'quit'", other);
                        continue;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read console input: {}", e);
                    break;
                }
            };
            if control.send(message).is_err() {
                break;
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args = Args::parse();
    let addr = format!("{}:{}", args.host, args.port);

    let game = ServerGame::new(args.game_config(), args.seed)?;
    let mut server = Server::new(&addr, game, args.max_clients, args.paused).await?;
    spawn_console(server.control());

    info!(
        "Starting server on {} ({} ms per turn)",
        addr, args.tick_ms
    );

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
