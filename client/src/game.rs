use log::{debug, info};
use shared::{
    apply_diff, BoardObserver, Engine, EngineError, Simulation, SnakeId, Snapshot, TurnDiff,
};

/// A local copy of the world, kept in lockstep with the server by replaying
/// its per-turn diffs.
pub struct ReplicaGame {
    engine: Option<Engine>,
    /// Held here until the first snapshot gives it a board to watch.
    observer: Option<Box<dyn BoardObserver>>,
    my_snake: Option<SnakeId>,
}

impl ReplicaGame {
    pub fn new() -> Self {
        Self {
            engine: None,
            observer: None,
            my_snake: None,
        }
    }

    pub fn with_observer(observer: Box<dyn BoardObserver>) -> Self {
        Self {
            observer: Some(observer),
            ..Self::new()
        }
    }

    pub fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }

    pub fn my_snake(&self) -> Option<SnakeId> {
        self.my_snake
    }

    pub fn set_my_snake(&mut self, snake_id: Option<SnakeId>) {
        self.my_snake = snake_id;
    }

    /// Replaces the whole world with a snapshot. The observer, if any, moves
    /// over to the new board and is shown every cell.
    pub fn apply_setup(&mut self, snapshot: Snapshot) -> Result<(), EngineError> {
        let mut engine = Engine::from_snapshot(snapshot)?;

        let observer = self
            .engine
            .as_mut()
            .and_then(Engine::take_observer)
            .or_else(|| self.observer.take());
        if let Some(observer) = observer {
            engine.set_observer(observer);
            engine.repaint();
        }

        info!(
            "Synchronized at turn {} with {} snakes",
            engine.turn(),
            engine.snakes().len()
        );
        if let Some(id) = self.my_snake {
            if engine.snake(id).is_none() {
                self.my_snake = None;
            }
        }
        self.engine = Some(engine);
        Ok(())
    }

    /// Replays the server's turn `turn`. Updates must arrive in order with no
    /// gaps; anything else means this replica has diverged.
    pub fn apply_update(&mut self, turn: u32, diff: &TurnDiff) -> Result<Vec<SnakeId>, EngineError> {
        let engine = self.engine.as_mut().ok_or(EngineError::NotInitialized)?;
        let expected = engine.turn() + 1;
        if turn != expected {
            return Err(EngineError::OutOfSync {
                expected,
                got: turn,
            });
        }

        let casualties = apply_diff(engine, diff);
        if let Some(id) = self.my_snake {
            if engine.snake(id).is_none() {
                debug!("Our snake {} is gone after turn {}", id, turn);
                self.my_snake = None;
            }
        }
        Ok(casualties)
    }
}

impl Default for ReplicaGame {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulation for ReplicaGame {
    type Input = (u32, TurnDiff);
    type Output = Vec<SnakeId>;

    fn advance(&mut self, (turn, diff): Self::Input) -> Result<Self::Output, EngineError> {
        self.apply_update(turn, &diff)
    }

    fn engine(&self) -> Option<&Engine> {
        self.engine.as_ref()
    }
}
