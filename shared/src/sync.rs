//! State synchronization between the authority and its replicas.
//!
//! The authority ships one [`Snapshot`] when a participant connects and a
//! [`TurnDiff`] every turn after that. A diff only carries what cannot be
//! recomputed: where apples appeared, which snakes joined or left, and which
//! intent each snake consumed. Movement, growth, collisions and tail
//! retraction are replayed by running the same [`Engine::step`] on the
//! replica.

use crate::board::BoardMatrix;
use crate::config::GameConfig;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::geometry::{Direction, Point};
use crate::snake::{Snake, SnakeId};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Membership change of the live snake set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnakeChange {
    Added(Snake),
    Removed(SnakeId),
}

impl SnakeChange {
    pub fn snake_id(&self) -> SnakeId {
        match self {
            SnakeChange::Added(snake) => snake.id,
            SnakeChange::Removed(id) => *id,
        }
    }
}

/// Everything non-deterministic that fed one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnDiff {
    /// Apples placed before the step, in placement order.
    pub new_apples: Vec<Point>,
    /// The intent each snake consumed during the step.
    pub resolved_intents: HashMap<SnakeId, Direction>,
    /// Joins and departures applied before the step, in the order they happened.
    /// Order matters: it is the processing order of the added snakes.
    pub snake_changes: Vec<SnakeChange>,
}

impl TurnDiff {
    pub fn is_empty(&self) -> bool {
        self.new_apples.is_empty()
            && self.resolved_intents.is_empty()
            && self.snake_changes.is_empty()
    }

    pub fn added(&self) -> impl Iterator<Item = &Snake> {
        self.snake_changes.iter().filter_map(|change| match change {
            SnakeChange::Added(snake) => Some(snake),
            SnakeChange::Removed(_) => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = SnakeId> + '_ {
        self.snake_changes.iter().filter_map(|change| match change {
            SnakeChange::Removed(id) => Some(*id),
            SnakeChange::Added(_) => None,
        })
    }
}

/// Full state for a participant that has just connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of turns already stepped; the next update carries `turn + 1`.
    pub turn: u32,
    pub config: GameConfig,
    pub board: BoardMatrix,
    pub snakes: Vec<Snake>,
    /// Live apples in placement order; bots break distance ties by it.
    pub apples: Vec<Point>,
}

/// A driver advancing a shared [`Engine`] one turn at a time.
///
/// The authority feeds it the commands collected since the last tick and
/// produces a diff; a replica feeds it that diff and reproduces the turn.
pub trait Simulation {
    type Input;
    type Output;

    fn advance(&mut self, input: Self::Input) -> Result<Self::Output, EngineError>;

    fn engine(&self) -> Option<&Engine>;

    fn turn(&self) -> u32 {
        self.engine().map(Engine::turn).unwrap_or(0)
    }
}

/// Replays one authority turn on a replica engine.
///
/// Order: membership changes, then intents, then apples, then the step.
/// Returns the ids of the snakes that died during the step. A change that
/// cannot be applied is logged and skipped; the turn is still stepped so the
/// replica stays on the authority's turn count.
pub fn apply_diff(engine: &mut Engine, diff: &TurnDiff) -> Vec<SnakeId> {
    for change in &diff.snake_changes {
        match change {
            SnakeChange::Added(snake) => {
                if let Err(e) = engine.add_snake(snake.clone()) {
                    warn!("Replica could not add snake {}: {}", snake.id, e);
                }
            }
            SnakeChange::Removed(id) => {
                if engine.remove_snake(*id).is_none() {
                    warn!("Replica was told to remove unknown snake {}", id);
                }
            }
        }
    }

    for (id, direction) in &diff.resolved_intents {
        if !engine.queue_intent(*id, *direction) {
            warn!("Replica got an intent for unknown snake {}", id);
        }
    }

    for &apple in &diff.new_apples {
        if let Err(e) = engine.place_apple(apple) {
            warn!("Replica could not place apple: {}", e);
        }
    }

    let casualties = engine.step();
    // The replica's own bookkeeping of this turn is exactly the diff it was given.
    engine.take_diff();
    casualties
}
