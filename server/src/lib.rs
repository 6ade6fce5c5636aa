//! # Snake Arena Server Library
//!
//! The authoritative side of the arena. It owns the only copy of the world
//! that makes random decisions, steps it on a fixed timer and ships every
//! participant what it needs to replay each turn locally.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! [`game::ServerGame`] wraps the shared engine. It generates the world,
//! spawns snakes for joining participants, keeps bots and apples topped up
//! and steers bots with the shared greedy policy. Every random decision is
//! drawn from one seedable generator.
//!
//! ### Turn Ordering
//! Joins and departures received between ticks are buffered and applied at
//! the start of the next tick, followed by bot top-up, apple top-up and bot
//! intents. Only then is the engine stepped. Each update therefore carries
//! exactly the inputs of the step it describes, and a snapshot taken between
//! ticks plus every later update reproduces the server's world.
//!
//! ### Client Management
//! [`client_manager::ClientManager`] tracks connections, the snake each one
//! controls and a bounded outbound queue per client. A replica cannot skip
//! an update, so a client that falls behind is disconnected rather than
//! silently desynchronized.
//!
//! ## Architecture
//!
//! A single event loop in [`network::Server`] owns the game and the clients.
//! Per-connection reader tasks decode frames and forward packets over a
//! channel; writer tasks drain each client's queue onto its socket. The loop
//! `select!`s between new connections, forwarded packets, the tick timer and
//! a once-per-second roster broadcast. Missed ticks are skipped.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::game::ServerGame;
//! use server::network::Server;
//! use shared::GameConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let game = ServerGame::new(GameConfig::default(), Some(42))?;
//!     let mut server = Server::new("127.0.0.1:8080", game, 32, false).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod client_manager;
pub mod game;
pub mod network;
