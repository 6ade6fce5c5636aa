//! # Snake Arena Client Library
//!
//! The participant side of the arena. A client never decides anything about
//! the world on its own: it receives one snapshot, then replays every turn
//! the server reports, and only ever sends back the direction it wants its
//! snake to take.
//!
//! ## Architecture Overview
//!
//! ### Deterministic Replica
//! [`game::ReplicaGame`] holds a full copy of the shared engine. Each update
//! carries only what the server decided at random (new apples, joins and
//! departures, the intent every snake consumed); the replica feeds those into
//! the same step the server ran and ends up with the same board. Collisions
//! and deaths are recomputed locally. Updates are numbered, and one that
//! does not follow the previous turn is rejected instead of being applied
//! to a diverged world.
//!
//! ### Autopilot
//! [`autopilot::Autopilot`] steers the participant's own snake with the
//! greedy policy the server uses for its bots, requesting a move after each
//! update.
//!
//! ## Module Organization
//!
//! - `game`: the replica and its turn checks
//! - `network`: the TCP connection and the socket-free [`network::Session`]
//!   that decides how to answer each packet
//! - `autopilot`: bot-driven steering
//! - `input`: terminal commands for manual steering
//! - `observer`: a board observer that reports changes through `log`
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::{Client, ClientOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let options = ClientOptions {
//!         name: "alice".to_string(),
//!         autopilot: true,
//!         ..ClientOptions::default()
//!     };
//!     let mut client = Client::new("127.0.0.1:8080", options).await?;
//!     client.run().await?;
//!     Ok(())
//! }
//! ```

pub mod autopilot;
pub mod game;
pub mod input;
pub mod network;
pub mod observer;
