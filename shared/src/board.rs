//! The board: one cell per coordinate, plus an optional one-way observer.

use crate::geometry::{out_of_bounds, Direction, Point};
use crate::snake::{Snake, SnakeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of a snake occupies a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    /// The head, with the direction it is facing.
    Head(Direction),
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Empty,
    Apple,
    /// Part of a static obstacle. `anchor` marks the one cell a renderer draws from.
    Obstacle { anchor: bool },
    Occupied { owner: SnakeId, segment: Segment },
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Cells a snake dies on when it moves into them.
    pub fn is_blocking(&self) -> bool {
        matches!(self, Cell::Obstacle { .. } | Cell::Occupied { .. })
    }

    pub fn owner(&self) -> Option<SnakeId> {
        match self {
            Cell::Occupied { owner, .. } => Some(*owner),
            _ => None,
        }
    }
}

/// Receives every board mutation. Implementations must not feed back into
/// the simulation; they only get shared views of the changed state.
pub trait BoardObserver: Send {
    fn on_cell_changed(&mut self, point: Point, cell: Cell);

    /// Called once per removed snake, before its cells are cleared.
    fn on_snake_removed(&mut self, _snake: &Snake) {}
}

/// Plain cell data as shipped in snapshots. Column-major like the board itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardMatrix {
    pub width: i32,
    pub height: i32,
    pub cells: Vec<Cell>,
}

impl BoardMatrix {
    pub fn empty(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; (width * height) as usize],
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.cells.len() == (self.width * self.height) as usize
    }
}

pub struct Board {
    width: i32,
    height: i32,
    cells: Vec<Cell>,
    observer: Option<Box<dyn BoardObserver>>,
}

impl Board {
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::Empty; (width * height) as usize],
            observer: None,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, point: Point) -> bool {
        !out_of_bounds(point, self.width, self.height)
    }

    fn index(&self, point: Point) -> usize {
        debug_assert!(self.contains(point), "board access out of range: {:?}", point);
        (point.x * self.height + point.y) as usize
    }

    /// Panics if `point` is off the board; callers check bounds first.
    pub fn get(&self, point: Point) -> Cell {
        self.cells[self.index(point)]
    }

    pub fn set(&mut self, point: Point, cell: Cell) {
        let index = self.index(point);
        self.cells[index] = cell;
        if let Some(observer) = self.observer.as_mut() {
            observer.on_cell_changed(point, cell);
        }
    }

    /// Bulk-loads a snapshot. Every cell is reported to the observer.
    pub fn replace_all(&mut self, matrix: BoardMatrix) {
        self.width = matrix.width;
        self.height = matrix.height;
        self.cells = matrix.cells;
        self.repaint();
    }

    /// Reports every cell to the observer, column by column.
    pub fn repaint(&mut self) {
        if let Some(observer) = self.observer.as_mut() {
            for x in 0..self.width {
                for y in 0..self.height {
                    let point = Point::new(x, y);
                    observer.on_cell_changed(point, self.cells[(x * self.height + y) as usize]);
                }
            }
        }
    }

    pub fn matrix(&self) -> BoardMatrix {
        BoardMatrix {
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
        }
    }

    /// All coordinates holding `cell`, scanning column by column.
    pub fn points_matching(&self, mut predicate: impl FnMut(&Cell) -> bool) -> Vec<Point> {
        let mut points = Vec::new();
        for x in 0..self.width {
            for y in 0..self.height {
                let point = Point::new(x, y);
                if predicate(&self.cells[self.index(point)]) {
                    points.push(point);
                }
            }
        }
        points
    }

    pub fn set_observer(&mut self, observer: Box<dyn BoardObserver>) {
        self.observer = Some(observer);
    }

    pub fn take_observer(&mut self) -> Option<Box<dyn BoardObserver>> {
        self.observer.take()
    }

    pub(crate) fn notify_snake_removed(&mut self, snake: &Snake) {
        if let Some(observer) = self.observer.as_mut() {
            observer.on_snake_removed(snake);
        }
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Board")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}
