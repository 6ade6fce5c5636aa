use shared::protocol::{decode_packet, read_frame, write_packet};
use shared::{apply_diff, Engine, Packet};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

const UPDATES_TO_WATCH: u32 = 20;

async fn next_packet(stream: &mut TcpStream) -> Result<Packet, Box<dyn std::error::Error>> {
    let payload = timeout(Duration::from_secs(5), read_frame(stream))
        .await??
        .ok_or("server closed the connection")?;
    Ok(decode_packet(&payload)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let server_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    println!("Connecting to {}", server_addr);
    let mut stream = TcpStream::connect(&server_addr).await?;

    let Packet::Setup { snapshot } = next_packet(&mut stream).await? else {
        return Err("first packet was not a setup".into());
    };
    println!(
        "Setup: turn {}, {}x{} board, {} snakes",
        snapshot.turn,
        snapshot.config.width,
        snapshot.config.height,
        snapshot.snakes.len()
    );
    let mut engine = Engine::from_snapshot(snapshot)?;

    write_packet(
        &mut stream,
        &Packet::SetProfile {
            display_name: "test-client".to_string(),
        },
    )
    .await?;
    write_packet(&mut stream, &Packet::Join).await?;
    println!("Join sent");

    let mut updates = 0;
    while updates < UPDATES_TO_WATCH {
        match next_packet(&mut stream).await? {
            Packet::Update { turn, diff } => {
                if turn != engine.turn() + 1 {
                    return Err(format!("expected turn {}, got {}", engine.turn() + 1, turn).into());
                }
                let casualties = apply_diff(&mut engine, &diff);
                println!(
                    "Update {}: {} apples, {} intents, {} changes, {} died",
                    turn,
                    diff.new_apples.len(),
                    diff.resolved_intents.len(),
                    diff.snake_changes.len(),
                    casualties.len()
                );
                updates += 1;
            }
            Packet::Joined { snake_id } => println!("Joined as snake {}", snake_id),
            Packet::SnakeRemoved { snake_id } => println!("Snake {} died", snake_id),
            Packet::Roster { players } => println!("Roster: {} players", players.len()),
            Packet::Disconnected { reason } => {
                println!("Disconnected: {}", reason);
                return Ok(());
            }
            other => println!("Unexpected packet: {:?}", other),
        }
    }

    write_packet(&mut stream, &Packet::Leave).await?;
    println!("Replica stayed in sync for {} updates", updates);
    Ok(())
}
