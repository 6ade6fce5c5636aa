//! Terminal commands for steering a snake without a renderer

use log::{error, warn};
use shared::Direction;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Move(Direction),
    Join,
    Leave,
    Quit,
}

/// Parses one line. Accepts WASD, arrow names and the session commands.
pub fn parse_command(line: &str) -> Option<Command> {
    let command = match line.trim().to_ascii_lowercase().as_str() {
        "w" | "up" => Command::Move(Direction::Up),
        "s" | "down" => Command::Move(Direction::Down),
        "a" | "left" => Command::Move(Direction::Left),
        "d" | "right" => Command::Move(Direction::Right),
        "join" => Command::Join,
        "leave" => Command::Leave,
        "quit" | "q" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Spawns task that turns stdin lines into commands
pub fn spawn_stdin_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => match parse_command(&line) {
                    Some(command) => {
                        if tx.send(command).await.is_err() {
                            break;
                        }
                    }
                    None => warn!("Unknown command '{}' (w/a/s/d, join, leave, quit)", line.trim()),
                },
                Ok(None) => break,
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            }
        }
    });
    rx
}
