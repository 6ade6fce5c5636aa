//! # Shared Game Library
//!
//! Everything the authority and the replicas must agree on: the grid, the
//! snakes living on it, the turn simulation, the bot policy and the packets
//! exchanged between the two sides.
//!
//! ## Deterministic Replay
//!
//! Both sides run the same [`Engine`]. The server steps it with its own random
//! inputs (apple positions, spawns, bot moves) and records those inputs in a
//! [`TurnDiff`]. A client rebuilds the world from one [`Snapshot`] and then
//! replays every diff through [`apply_diff`], arriving at the same state
//! without the server ever sending positions.
//!
//! ## Module Organization
//!
//! - `geometry`: points, directions and polyline walks
//! - `board`: the cell grid and its observer hook
//! - `snake`: the polyline snake and its intent queue
//! - `engine`: the per-turn simulation
//! - `bot`: the greedy apple-chasing policy
//! - `sync`: diffs, snapshots and the replay entry point
//! - `protocol`: wire packets and framing
//! - `config` and `error`: session parameters and error types

pub mod board;
pub mod bot;
pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod protocol;
pub mod snake;
pub mod sync;

pub use board::{Board, BoardMatrix, BoardObserver, Cell, Segment};
pub use config::GameConfig;
pub use engine::Engine;
pub use error::{ConfigError, EngineError, ProtocolError};
pub use geometry::{Direction, Point};
pub use protocol::{Packet, RosterEntry};
pub use snake::{Snake, SnakeId};
pub use sync::{apply_diff, SnakeChange, Simulation, Snapshot, TurnDiff};
