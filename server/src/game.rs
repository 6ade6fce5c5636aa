//! Authoritative game driver: world generation, spawning, bots and the tick

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::bot::{choose_intent, BOT_NAMES};
use shared::config::{OBSTACLE_HEIGHT, OBSTACLE_WIDTH};
use shared::snake::SNAKE_COLORS;
use shared::{
    ConfigError, Direction, Engine, EngineError, GameConfig, Point, RosterEntry, Simulation,
    Snake, SnakeId, Snapshot, TurnDiff,
};
use std::collections::HashMap;

/// Random positions tried before a spawn or apple placement gives up.
pub const MAX_PLACEMENT_ATTEMPTS: usize = 1000;

const MAX_SNAKE_ID: SnakeId = 9999;

/// Membership changes collected between ticks and applied at the start of the
/// next one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameCommand {
    Spawn { client_id: u32 },
    Despawn { snake_id: SnakeId },
}

/// What one tick produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub turn: u32,
    pub diff: TurnDiff,
    /// `(client_id, snake_id)` for every spawn request that succeeded.
    pub spawned: Vec<(u32, SnakeId)>,
    pub casualties: Vec<SnakeId>,
}

pub struct ServerGame {
    engine: Engine,
    rng: StdRng,
    bot_names: HashMap<SnakeId, String>,
}

impl ServerGame {
    /// Builds a fresh world: obstacles, initial apples and initial bots.
    /// `seed` makes every later random decision reproducible.
    pub fn new(config: GameConfig, seed: Option<u64>) -> Result<Self, ConfigError> {
        let engine = Engine::new(config)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut game = Self {
            engine,
            rng,
            bot_names: HashMap::new(),
        };
        game.place_obstacles();
        game.top_up_apples();
        game.top_up_bots();
        // The initial world travels in snapshots, not in a diff.
        game.engine.take_diff();

        info!(
            "World ready: {}x{}, {} apples, {} snakes",
            game.engine.config().width,
            game.engine.config().height,
            game.engine.apples().len(),
            game.engine.snakes().len()
        );
        Ok(game)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn snapshot(&self) -> Snapshot {
        self.engine.snapshot()
    }

    /// Queues a participant's intent for the next step. Returns false if the
    /// snake is gone.
    pub fn queue_intent(&mut self, snake_id: SnakeId, direction: Direction) -> bool {
        self.engine.queue_intent(snake_id, direction)
    }

    /// Runs one turn. Order matters for replicas: membership, bots, apples,
    /// bot intents, then the step itself.
    pub fn tick(&mut self, commands: Vec<GameCommand>) -> TickReport {
        let mut spawned = Vec::new();
        for command in commands {
            match command {
                GameCommand::Spawn { client_id } => match self.spawn_snake(false) {
                    Ok(snake_id) => {
                        info!("Client {} now controls snake {}", client_id, snake_id);
                        spawned.push((client_id, snake_id));
                    }
                    Err(e) => warn!("Could not spawn a snake for client {}: {}", client_id, e),
                },
                GameCommand::Despawn { snake_id } => {
                    if self.engine.remove_snake(snake_id).is_some() {
                        debug!("Removed departed snake {}", snake_id);
                    }
                }
            }
        }

        self.top_up_bots();
        self.top_up_apples();
        self.queue_bot_intents();

        let casualties = self.engine.step();
        for snake_id in &casualties {
            self.bot_names.remove(snake_id);
        }

        TickReport {
            turn: self.engine.turn(),
            diff: self.engine.take_diff(),
            spawned,
            casualties,
        }
    }

    /// Names, lengths and bot flags of every live snake. `player_names` maps
    /// human-controlled snakes to their display names.
    pub fn roster(&self, player_names: &HashMap<SnakeId, String>) -> Vec<RosterEntry> {
        self.engine
            .snakes()
            .iter()
            .map(|snake| RosterEntry {
                snake_id: snake.id,
                name: self
                    .bot_names
                    .get(&snake.id)
                    .or_else(|| player_names.get(&snake.id))
                    .cloned()
                    .unwrap_or_else(|| format!("snake-{}", snake.id)),
                length: snake.length,
                is_bot: snake.is_bot,
            })
            .collect()
    }

    /// Places a straight snake of the configured size on a random free
    /// segment, heading towards the middle of the board.
    pub fn spawn_snake(&mut self, is_bot: bool) -> Result<SnakeId, EngineError> {
        let id = self.unused_snake_id()?;
        let (width, height) = (self.engine.config().width, self.engine.config().height);
        let reach = self.engine.config().start_size as i32 - 1;
        let color = SNAKE_COLORS[self.rng.gen_range(0..SNAKE_COLORS.len())];

        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let head = Point::new(self.rng.gen_range(0..width), self.rng.gen_range(0..height));
            let tail = if self.rng.gen_bool(0.5) {
                let dx = if 2 * head.x <= width { -reach } else { reach };
                Point::new(head.x + dx, head.y)
            } else {
                let dy = if 2 * head.y <= height { -reach } else { reach };
                Point::new(head.x, head.y + dy)
            };

            let mut snake = Snake::new(id, head, tail, color);
            snake.is_bot = is_bot;
            let fits = snake
                .cells()
                .map(|cells| cells.iter().all(|p| self.engine.is_free(*p)))
                .unwrap_or(false);
            if !fits {
                continue;
            }

            self.engine.add_snake(snake)?;
            if is_bot {
                let name = BOT_NAMES[self.rng.gen_range(0..BOT_NAMES.len())];
                self.bot_names.insert(id, name.to_string());
            }
            return Ok(id);
        }

        Err(EngineError::NoSpawnSpace {
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    fn unused_snake_id(&mut self) -> Result<SnakeId, EngineError> {
        for _ in 0..MAX_PLACEMENT_ATTEMPTS {
            let id = self.rng.gen_range(1..=MAX_SNAKE_ID);
            if self.engine.snake(id).is_none() {
                return Ok(id);
            }
        }
        Err(EngineError::NoSpawnSpace {
            attempts: MAX_PLACEMENT_ATTEMPTS,
        })
    }

    /// One obstacle per vertical zone, kept away from the top and bottom rows.
    fn place_obstacles(&mut self) {
        let config = self.engine.config();
        let (count, width, height) = (config.obstacle_count, config.width, config.height);
        if count == 0 {
            return;
        }
        let zone = width / count as i32;

        for i in 0..count as i32 {
            let x_range = i * zone..(i + 1) * zone - OBSTACLE_WIDTH;
            let y_range = 2..height - OBSTACLE_HEIGHT - 2;
            let top_left = Point::new(
                self.rng.gen_range(x_range),
                self.rng.gen_range(y_range),
            );
            if let Err(e) = self.engine.place_obstacle(top_left) {
                warn!("Skipping obstacle {}: {}", i, e);
            }
        }
    }

    fn top_up_apples(&mut self) {
        let (width, height) = (self.engine.config().width, self.engine.config().height);
        for _ in 0..self.engine.missing_apples() {
            let free = (0..MAX_PLACEMENT_ATTEMPTS)
                .map(|_| Point::new(self.rng.gen_range(0..width), self.rng.gen_range(0..height)))
                .find(|p| self.engine.is_free(*p));
            match free {
                Some(point) => {
                    if let Err(e) = self.engine.place_apple(point) {
                        warn!("Could not place apple: {}", e);
                    }
                }
                None => {
                    warn!("No free cell for an apple");
                    break;
                }
            }
        }
    }

    /// Adds bots until the board holds the configured minimum of snakes.
    fn top_up_bots(&mut self) {
        while self.engine.snakes().len() < self.engine.config().min_snakes {
            match self.spawn_snake(true) {
                Ok(id) => debug!("Added bot {}", id),
                Err(e) => {
                    warn!("Could not add a bot: {}", e);
                    break;
                }
            }
        }
    }

    fn queue_bot_intents(&mut self) {
        let probability = self.engine.config().bot_straight_probability;
        let engine = &self.engine;
        let intents: Vec<(SnakeId, Direction)> = engine
            .snakes()
            .iter()
            .filter(|snake| snake.is_bot)
            .filter_map(|snake| {
                choose_intent(engine, snake, &mut self.rng, probability)
                    .map(|dir| (snake.id, dir))
            })
            .collect();

        for (snake_id, direction) in intents {
            self.engine.queue_intent(snake_id, direction);
        }
    }
}

impl Simulation for ServerGame {
    type Input = Vec<GameCommand>;
    type Output = TickReport;

    fn advance(&mut self, input: Self::Input) -> Result<Self::Output, EngineError> {
        Ok(self.tick(input))
    }

    fn engine(&self) -> Option<&Engine> {
        Some(&self.engine)
    }
}
