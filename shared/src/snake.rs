//! Snakes stored as a minimal polyline of articulation points.

use crate::error::EngineError;
use crate::geometry::{out_of_bounds, unit_direction, walk_line, walk_polyline, Direction, Point};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub type SnakeId = u32;

/// At most this many unconsumed intents are kept per snake.
pub const INTENT_QUEUE_CAPACITY: usize = 2;

pub const SNAKE_COLORS: [&str; 8] = [
    "#abc", "#cde", "#123", "#1e1", "#59f", "#9b6", "#b38", "#a3c",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    pub id: SnakeId,
    /// Head first, tail last. Interior points exist only where the body turns.
    pub articulations: VecDeque<Point>,
    /// Cells currently covered.
    pub length: usize,
    /// Length the snake is growing towards after eating.
    pub target_length: usize,
    /// Replicas only ever fill this from diffs, so it never travels on the wire.
    #[serde(skip)]
    pub pending_intents: VecDeque<Direction>,
    pub color: String,
    pub is_bot: bool,
}

impl Snake {
    /// A straight snake from `head` to `tail`.
    pub fn new(id: SnakeId, head: Point, tail: Point, color: impl Into<String>) -> Self {
        let length = (head.x - tail.x).unsigned_abs() as usize
            + (head.y - tail.y).unsigned_abs() as usize
            + 1;
        Self {
            id,
            articulations: VecDeque::from([head, tail]),
            length,
            target_length: length,
            pending_intents: VecDeque::with_capacity(INTENT_QUEUE_CAPACITY),
            color: color.into(),
            is_bot: false,
        }
    }

    pub fn head(&self) -> Point {
        self.articulations[0]
    }

    pub fn tail(&self) -> Point {
        self.articulations[self.articulations.len() - 1]
    }

    fn malformed(&self, reason: &str) -> EngineError {
        EngineError::MalformedSnake {
            id: self.id,
            reason: reason.to_string(),
        }
    }

    pub fn head_direction(&self) -> Result<Direction, EngineError> {
        if self.articulations.len() < 2 {
            return Err(self.malformed("fewer than two articulations"));
        }
        unit_direction(self.articulations[1], self.articulations[0])
            .ok_or_else(|| self.malformed("head segment has no direction"))
    }

    /// The direction the tail moves in when it retracts.
    pub fn tail_direction(&self) -> Result<Direction, EngineError> {
        let len = self.articulations.len();
        if len < 2 {
            return Err(self.malformed("fewer than two articulations"));
        }
        unit_direction(self.articulations[len - 1], self.articulations[len - 2])
            .ok_or_else(|| self.malformed("tail segment has no direction"))
    }

    pub fn is_intent_legal(&self, direction: Direction) -> Result<bool, EngineError> {
        Ok(direction.is_perpendicular(self.head_direction()?))
    }

    pub fn queue_intent(&mut self, direction: Direction) {
        if self.pending_intents.len() >= INTENT_QUEUE_CAPACITY {
            self.pending_intents.pop_front();
        }
        self.pending_intents.push_back(direction);
    }

    /// Pops queued intents until one is legal for the current heading.
    /// Stale entries are dropped along the way.
    pub fn pop_next_intent(&mut self) -> Result<Option<Direction>, EngineError> {
        let heading = self.head_direction()?;
        while let Some(direction) = self.pending_intents.pop_front() {
            if direction.is_perpendicular(heading) {
                return Ok(Some(direction));
            }
        }
        Ok(None)
    }

    pub fn grow(&mut self, bonus: usize) {
        self.target_length += bonus;
    }

    /// Every covered cell, head first.
    pub fn cells(&self) -> Result<Vec<Point>, EngineError> {
        let mut cells = Vec::with_capacity(self.length);
        walk_polyline(&self.articulations, |p| cells.push(p))?;
        Ok(cells)
    }

    /// Checks the polyline against a board of the given size: at least two
    /// distinct points, axis-aligned segments, all in bounds, and covering
    /// exactly `length` cells.
    pub fn validate(&self, width: i32, height: i32) -> Result<(), EngineError> {
        if self.articulations.len() < 2 {
            return Err(self.malformed("fewer than two articulations"));
        }
        if self.length > self.target_length {
            return Err(self.malformed("length exceeds target length"));
        }
        // Bounds first, so a bogus segment is never walked.
        if let Some(&point) = self
            .articulations
            .iter()
            .find(|p| out_of_bounds(**p, width, height))
        {
            return Err(EngineError::OutOfBounds(point));
        }
        for pair in self.articulations.iter().zip(self.articulations.iter().skip(1)) {
            if pair.0 == pair.1 {
                return Err(self.malformed("repeated articulation"));
            }
            walk_line(*pair.0, *pair.1, |_| {})?;
        }
        let covered = self.cells()?.len();
        if covered != self.length {
            return Err(self.malformed(&format!(
                "polyline covers {} cells but length is {}",
                covered, self.length
            )));
        }
        Ok(())
    }
}
