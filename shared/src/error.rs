//! Error types shared by the authority and the replicas

use crate::geometry::Point;
use crate::snake::SnakeId;
use thiserror::Error;

/// Failures raised while building or stepping the simulation.
///
/// None of these abort a turn: construction errors make the spawner resample,
/// and faults raised while stepping one snake only kill that snake.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("segment {from:?} -> {to:?} is not axis-aligned")]
    DiagonalSegment { from: Point, to: Point },

    #[error("cell {0:?} is already occupied")]
    OccupiedCell(Point),

    #[error("point {0:?} is outside the board")]
    OutOfBounds(Point),

    #[error("snake {id} is malformed: {reason}")]
    MalformedSnake { id: SnakeId, reason: String },

    #[error("snake {0} is already on the board")]
    DuplicateSnake(SnakeId),

    #[error("no free spawn position after {attempts} attempts")]
    NoSpawnSpace { attempts: usize },

    #[error("expected update for turn {expected}, got turn {got}")]
    OutOfSync { expected: u32, got: u32 },

    #[error("no snapshot has been applied yet")]
    NotInitialized,

    #[error("snapshot rejected: {0}")]
    MalformedSnapshot(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Rejected session parameters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("board must be at least {min}x{min}, got {width}x{height}")]
    BoardTooSmall { width: i32, height: i32, min: i32 },

    #[error("start size must be at least 2, got {0}")]
    StartSizeTooSmall(usize),

    #[error("start size {start_size} does not fit a {width}x{height} board")]
    StartSizeTooLarge {
        start_size: usize,
        width: i32,
        height: i32,
    },

    #[error("{count} obstacles do not fit across a board {width} cells wide")]
    TooManyObstacles { count: usize, width: i32 },

    #[error("bot straight probability must be within [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("tick duration must be positive")]
    ZeroTickDuration,
}

/// Transport-level failures when framing packets.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    FrameTooLarge { len: usize, max: usize },
}
