//! Greedy apple-chasing policy used by server bots and the client autopilot.

use crate::engine::Engine;
use crate::geometry::{candidate_directions, square_distance, Direction, Point};
use crate::snake::Snake;
use rand::Rng;

pub const BOT_NAMES: [&str; 24] = [
    "Annie", "Bob", "Carly", "Damien", "Jacob", "Isabella", "Ethan", "Emma", "Michael", "Olivia",
    "Alexander", "Sophia", "William", "Ava", "Joshua", "Emily", "Daniel", "Madison", "Jayden",
    "Abigail", "Noah", "Chloe", "Anthony", "Mia",
];

/// The closest apple to `origin` by squared distance. Ties go to the apple
/// placed first.
pub fn nearest_apple(origin: Point, apples: &[Point]) -> Option<Point> {
    let mut best: Option<(Point, i64)> = None;
    for &apple in apples {
        let distance = square_distance(origin, apple);
        if best.map_or(true, |(_, d)| distance < d) {
            best = Some((apple, distance));
        }
    }
    best.map(|(apple, _)| apple)
}

/// Picks a direction for `snake` to move towards the nearest apple.
///
/// Returns `None` when the snake should keep its heading: on a random
/// straight turn, when there is nothing to chase, when the best safe move is
/// already straight ahead, or when every move is blocked.
pub fn choose_intent<R: Rng>(
    engine: &Engine,
    snake: &Snake,
    rng: &mut R,
    straight_probability: f64,
) -> Option<Direction> {
    if rng.gen_bool(straight_probability) {
        return None;
    }
    let target = nearest_apple(snake.head(), engine.apples())?;
    let heading = snake.head_direction().ok()?;
    let board = engine.board();

    candidate_directions(snake.head(), heading, target)
        .into_iter()
        .find(|c| board.contains(c.next) && !board.get(c.next).is_blocking())
        .map(|c| c.direction)
        .filter(|&direction| direction != heading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use assert_approx_eq::assert_approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn engine() -> Engine {
        Engine::new(GameConfig {
            width: 20,
            height: 20,
            desired_apples: 0,
            obstacle_count: 0,
            min_snakes: 0,
            ..GameConfig::default()
        })
        .unwrap()
    }

    fn right_facing(engine: &mut Engine) -> Snake {
        let snake = Snake::new(1, Point::new(5, 5), Point::new(2, 5), "#abc");
        engine.add_snake(snake.clone()).unwrap();
        snake
    }

    #[test]
    fn test_nearest_apple_prefers_first_on_tie() {
        let apples = [Point::new(7, 5), Point::new(3, 5), Point::new(5, 9)];
        assert_eq!(nearest_apple(Point::new(5, 5), &apples), Some(Point::new(7, 5)));
        assert_eq!(nearest_apple(Point::new(5, 5), &[]), None);
    }

    #[test]
    fn test_no_apples_means_no_intent() {
        let mut engine = engine();
        let snake = right_facing(&mut engine);
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(choose_intent(&engine, &snake, &mut rng, 0.0), None);
    }

    #[test]
    fn test_turns_towards_apple() {
        let mut engine = engine();
        let snake = right_facing(&mut engine);
        engine.place_apple(Point::new(5, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(
            choose_intent(&engine, &snake, &mut rng, 0.0),
            Some(Direction::Up)
        );
    }

    #[test]
    fn test_apple_ahead_keeps_heading() {
        let mut engine = engine();
        let snake = right_facing(&mut engine);
        engine.place_apple(Point::new(12, 5)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        assert_eq!(choose_intent(&engine, &snake, &mut rng, 0.0), None);
    }

    #[test]
    fn test_avoids_blocked_candidate() {
        let mut engine = engine();
        let snake = right_facing(&mut engine);
        engine.place_apple(Point::new(5, 1)).unwrap();
        // Obstacle covers (5..=6, 2..=4), right above the head.
        engine.place_obstacle(Point::new(5, 2)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // Up is blocked; straight ahead is the next best free option.
        assert_eq!(choose_intent(&engine, &snake, &mut rng, 0.0), None);
    }

    #[test]
    fn test_turns_when_straight_is_blocked() {
        let mut engine = engine();
        let snake = right_facing(&mut engine);
        engine.place_apple(Point::new(12, 5)).unwrap();
        engine.place_obstacle(Point::new(6, 4)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        // Both turns are equally far; the first listed perpendicular wins.
        assert_eq!(
            choose_intent(&engine, &snake, &mut rng, 0.0),
            Some(Direction::Down)
        );
    }

    #[test]
    fn test_always_straight_when_probability_is_one() {
        let mut engine = engine();
        let snake = right_facing(&mut engine);
        engine.place_apple(Point::new(5, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..50 {
            assert_eq!(choose_intent(&engine, &snake, &mut rng, 1.0), None);
        }
    }

    #[test]
    fn test_straight_rate_matches_probability() {
        let mut engine = engine();
        let snake = right_facing(&mut engine);
        engine.place_apple(Point::new(5, 1)).unwrap();
        let mut rng = StdRng::seed_from_u64(42);

        let trials = 20_000;
        let skipped = (0..trials)
            .filter(|_| choose_intent(&engine, &snake, &mut rng, 0.1).is_none())
            .count();

        assert_approx_eq!(skipped as f64 / trials as f64, 0.1, 0.02);
    }
}
