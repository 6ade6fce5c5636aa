//! Drives the participant's own snake with the same policy the server's bots use

use crate::game::ReplicaGame;
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::bot::choose_intent;
use shared::Direction;

pub struct Autopilot {
    rng: StdRng,
}

impl Autopilot {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// The move to request for the next turn, if any.
    pub fn next_move(&mut self, game: &ReplicaGame) -> Option<Direction> {
        let engine = game.engine()?;
        let snake = engine.snake(game.my_snake()?)?;
        choose_intent(
            engine,
            snake,
            &mut self.rng,
            engine.config().bot_straight_probability,
        )
    }
}
