//! The turn simulation shared by the authority and every replica.
//!
//! [`Engine::step`] is fully deterministic: given the same board, the same
//! snakes in the same order and the same queued intents, it produces the same
//! next state. Everything random (apple placement, spawning) happens outside
//! of it and is recorded in the pending [`TurnDiff`].

use crate::board::{Board, BoardObserver, Cell, Segment};
use crate::config::{GameConfig, OBSTACLE_HEIGHT, OBSTACLE_WIDTH};
use crate::error::{ConfigError, EngineError};
use crate::geometry::{out_of_bounds, walk_polyline, Direction, Point};
use crate::snake::{Snake, SnakeId};
use crate::sync::{SnakeChange, Snapshot, TurnDiff};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct Engine {
    config: GameConfig,
    board: Board,
    /// Live snakes in insertion order, which is also their processing order.
    snakes: Vec<Snake>,
    /// Live apples in placement order.
    apples: Vec<Point>,
    turn: u32,
    pending: TurnDiff,
}

impl Engine {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            board: Board::new(config.width, config.height),
            config,
            snakes: Vec::new(),
            apples: Vec::new(),
            turn: 0,
            pending: TurnDiff::default(),
        })
    }

    /// Rebuilds an engine from a snapshot, checking it is internally
    /// consistent before accepting it.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, EngineError> {
        let Snapshot {
            turn,
            config,
            board: matrix,
            snakes,
            apples,
        } = snapshot;
        config.validate()?;

        if !matrix.is_well_formed() || matrix.width != config.width || matrix.height != config.height
        {
            return Err(EngineError::MalformedSnapshot(format!(
                "board is {}x{} with {} cells, config says {}x{}",
                matrix.width,
                matrix.height,
                matrix.cells.len(),
                config.width,
                config.height
            )));
        }

        let mut board = Board::new(config.width, config.height);
        board.replace_all(matrix);

        let mut seen = HashSet::new();
        for snake in &snakes {
            if !seen.insert(snake.id) {
                return Err(EngineError::DuplicateSnake(snake.id));
            }
            snake.validate(config.width, config.height)?;
            if let Some(point) = snake
                .cells()?
                .into_iter()
                .find(|p| board.get(*p).owner() != Some(snake.id))
            {
                return Err(EngineError::MalformedSnapshot(format!(
                    "snake {} covers {:?} which the board does not assign to it",
                    snake.id, point
                )));
            }
        }

        let mut on_board = board.points_matching(|cell| *cell == Cell::Apple);
        let mut listed = apples.clone();
        on_board.sort_unstable_by_key(|p| (p.x, p.y));
        listed.sort_unstable_by_key(|p| (p.x, p.y));
        if on_board != listed {
            return Err(EngineError::MalformedSnapshot(format!(
                "{} apples listed but the board holds {}",
                apples.len(),
                on_board.len()
            )));
        }

        let snakes = snakes
            .into_iter()
            .map(|mut snake| {
                snake.pending_intents.clear();
                snake
            })
            .collect();

        Ok(Self {
            config,
            board,
            snakes,
            apples,
            turn,
            pending: TurnDiff::default(),
        })
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            turn: self.turn,
            config: self.config.clone(),
            board: self.board.matrix(),
            snakes: self
                .snakes
                .iter()
                .cloned()
                .map(|mut snake| {
                    snake.pending_intents.clear();
                    snake
                })
                .collect(),
            apples: self.apples.clone(),
        }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn snakes(&self) -> &[Snake] {
        &self.snakes
    }

    pub fn snake(&self, id: SnakeId) -> Option<&Snake> {
        self.snakes.iter().find(|s| s.id == id)
    }

    pub fn apples(&self) -> &[Point] {
        &self.apples
    }

    /// How many apples are needed to get back to the configured count.
    pub fn missing_apples(&self) -> usize {
        self.config.desired_apples.saturating_sub(self.apples.len())
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn set_observer(&mut self, observer: Box<dyn BoardObserver>) {
        self.board.set_observer(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn BoardObserver>> {
        self.board.take_observer()
    }

    /// Shows the observer the whole board, e.g. right after attaching it.
    pub fn repaint(&mut self) {
        self.board.repaint();
    }

    /// In bounds and empty.
    pub fn is_free(&self, point: Point) -> bool {
        self.board.contains(point) && self.board.get(point).is_empty()
    }

    /// Puts a snake on the board and appends it to the processing order.
    pub fn add_snake(&mut self, mut snake: Snake) -> Result<(), EngineError> {
        if self.snake(snake.id).is_some() {
            return Err(EngineError::DuplicateSnake(snake.id));
        }
        snake.validate(self.config.width, self.config.height)?;

        let cells = snake.cells()?;
        if let Some(&point) = cells.iter().find(|p| !self.board.get(**p).is_empty()) {
            return Err(EngineError::OccupiedCell(point));
        }

        let heading = snake.head_direction()?;
        for (i, &point) in cells.iter().enumerate() {
            let segment = if i == 0 {
                Segment::Head(heading)
            } else {
                Segment::Body
            };
            self.board.set(
                point,
                Cell::Occupied {
                    owner: snake.id,
                    segment,
                },
            );
        }

        snake.pending_intents.clear();
        debug!(
            "Added snake {} at {:?} heading {:?}",
            snake.id,
            snake.head(),
            heading
        );
        self.pending
            .snake_changes
            .push(SnakeChange::Added(snake.clone()));
        self.snakes.push(snake);
        Ok(())
    }

    /// Removes a snake for a reason outside the simulation (departure).
    /// Recorded in the pending diff so replicas remove it too.
    pub fn remove_snake(&mut self, id: SnakeId) -> Option<Snake> {
        let snake = self.kill(id)?;
        self.pending.snake_changes.push(SnakeChange::Removed(id));
        Some(snake)
    }

    pub fn queue_intent(&mut self, id: SnakeId, direction: Direction) -> bool {
        match self.snakes.iter_mut().find(|s| s.id == id) {
            Some(snake) => {
                snake.queue_intent(direction);
                true
            }
            None => false,
        }
    }

    pub fn place_apple(&mut self, point: Point) -> Result<(), EngineError> {
        if !self.board.contains(point) {
            return Err(EngineError::OutOfBounds(point));
        }
        if !self.board.get(point).is_empty() {
            return Err(EngineError::OccupiedCell(point));
        }
        self.board.set(point, Cell::Apple);
        self.apples.push(point);
        self.pending.new_apples.push(point);
        Ok(())
    }

    /// Places a 2x3 obstacle with its anchor at `top_left`. Only done while
    /// building the world, so it is not part of any diff.
    pub fn place_obstacle(&mut self, top_left: Point) -> Result<(), EngineError> {
        let mut cells = Vec::with_capacity((OBSTACLE_WIDTH * OBSTACLE_HEIGHT) as usize);
        for dx in 0..OBSTACLE_WIDTH {
            for dy in 0..OBSTACLE_HEIGHT {
                let point = Point::new(top_left.x + dx, top_left.y + dy);
                if !self.board.contains(point) {
                    return Err(EngineError::OutOfBounds(point));
                }
                if !self.board.get(point).is_empty() {
                    return Err(EngineError::OccupiedCell(point));
                }
                cells.push(point);
            }
        }
        for point in cells {
            self.board.set(
                point,
                Cell::Obstacle {
                    anchor: point == top_left,
                },
            );
        }
        Ok(())
    }

    /// Hands over everything recorded since the last call.
    pub fn take_diff(&mut self) -> TurnDiff {
        std::mem::take(&mut self.pending)
    }

    /// Advances the world by one turn and returns the ids of the snakes that
    /// died in it.
    ///
    /// Snakes are processed in insertion order. When two heads meet, the
    /// tombstone rule makes both die no matter which one moves first.
    pub fn step(&mut self) -> Vec<SnakeId> {
        let order: Vec<SnakeId> = self.snakes.iter().map(|s| s.id).collect();
        let positions: HashMap<SnakeId, usize> =
            order.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        // Only valid within this turn; dropped on return.
        let mut tombstones: HashSet<Point> = HashSet::new();
        let mut casualties = Vec::new();

        for (turn_index, &id) in order.iter().enumerate() {
            let Some(index) = self.snakes.iter().position(|s| s.id == id) else {
                continue;
            };
            if let Err(e) =
                self.advance_snake(index, turn_index, &positions, &mut tombstones, &mut casualties)
            {
                warn!("Snake {} faulted on turn {}: {}", id, self.turn + 1, e);
                self.kill_into(id, &mut casualties);
            }
        }

        self.turn += 1;
        if !casualties.is_empty() {
            debug!("Turn {}: snakes {:?} died", self.turn, casualties);
        }
        casualties
    }

    fn advance_snake(
        &mut self,
        index: usize,
        turn_index: usize,
        positions: &HashMap<SnakeId, usize>,
        tombstones: &mut HashSet<Point>,
        casualties: &mut Vec<SnakeId>,
    ) -> Result<(), EngineError> {
        let (width, height) = (self.config.width, self.config.height);
        let growth_bonus = self.config.growth_bonus;

        let snake = &mut self.snakes[index];
        let id = snake.id;
        let intent = snake.pop_next_intent()?;
        let heading = match intent {
            Some(direction) => {
                self.pending.resolved_intents.insert(id, direction);
                direction
            }
            None => snake.head_direction()?,
        };

        let old_head = snake.head();
        let new_head = old_head.step(heading);

        if out_of_bounds(new_head, width, height) {
            debug!("Snake {} left the board at {:?}", id, new_head);
            self.kill_into(id, casualties);
            return Ok(());
        }

        let target = self.board.get(new_head);
        if target.is_blocking() || tombstones.contains(&new_head) {
            debug!("Snake {} crashed into {:?} at {:?}", id, target, new_head);
            self.kill_into(id, casualties);

            if let Cell::Occupied {
                owner,
                segment: Segment::Head(_),
            } = target
            {
                match positions.get(&owner) {
                    Some(&other) if other < turn_index => self.kill_into(owner, casualties),
                    // The other head has not moved yet. Whatever enters our old head
                    // cell later this turn dies too.
                    _ => {
                        tombstones.insert(old_head);
                    }
                }
            }
            return Ok(());
        }

        if target == Cell::Apple {
            self.apples.retain(|&p| p != new_head);
            snake.grow(growth_bonus);
        }

        self.board.set(
            old_head,
            Cell::Occupied {
                owner: id,
                segment: Segment::Body,
            },
        );
        self.board.set(
            new_head,
            Cell::Occupied {
                owner: id,
                segment: Segment::Head(heading),
            },
        );
        if intent.is_some() {
            snake.articulations.push_front(new_head);
        } else {
            snake.articulations[0] = new_head;
        }

        if snake.length < snake.target_length {
            snake.length += 1;
            return Ok(());
        }

        let old_tail = snake.tail();
        let new_tail = old_tail.step(snake.tail_direction()?);
        self.board.set(old_tail, Cell::Empty);
        let last = snake.articulations.len() - 1;
        if snake.articulations[last - 1] == new_tail {
            snake.articulations.pop_back();
        } else {
            snake.articulations[last] = new_tail;
        }
        Ok(())
    }

    fn kill_into(&mut self, id: SnakeId, casualties: &mut Vec<SnakeId>) {
        if self.kill(id).is_some() {
            casualties.push(id);
        }
    }

    /// Takes a snake out of the live set, notifies the observer, then clears
    /// the cells it still owns.
    fn kill(&mut self, id: SnakeId) -> Option<Snake> {
        let index = self.snakes.iter().position(|s| s.id == id)?;
        let snake = self.snakes.remove(index);
        self.board.notify_snake_removed(&snake);

        let mut cells = Vec::with_capacity(snake.length);
        if let Err(e) = walk_polyline(&snake.articulations, |p| cells.push(p)) {
            warn!("Clearing malformed snake {} by owner scan: {}", id, e);
            cells = self.board.points_matching(|cell| cell.owner() == Some(id));
        }
        for point in cells {
            if self.board.contains(point) && self.board.get(point).owner() == Some(id) {
                self.board.set(point, Cell::Empty);
            }
        }
        Some(snake)
    }
}
