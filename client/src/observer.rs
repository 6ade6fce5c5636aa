//! A board observer that reports what happens on the replica through `log`

use log::{debug, trace};
use shared::{BoardObserver, Cell, Point, Snake};

#[derive(Debug, Default)]
pub struct LoggingObserver {
    pub cells_changed: u64,
    pub snakes_removed: u64,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BoardObserver for LoggingObserver {
    fn on_cell_changed(&mut self, point: Point, cell: Cell) {
        self.cells_changed += 1;
        trace!("({}, {}) -> {:?}", point.x, point.y, cell);
    }

    fn on_snake_removed(&mut self, snake: &Snake) {
        self.snakes_removed += 1;
        debug!("Snake {} removed at length {}", snake.id, snake.length);
    }
}
